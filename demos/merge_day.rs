//! Merge one day of overlapping wearable data and print the result

fn main() {
    let json = r#"{
        "snapshots": {
            "apple_watch": {
                "steps": 10000,
                "heart_rate_readings": [
                    { "timestamp": "2024-01-15T08:00:10Z", "value": 72 },
                    { "timestamp": "2024-01-15T08:05:00Z", "value": 75 },
                    { "timestamp": "2024-01-15T12:30:00Z", "value": 88 }
                ],
                "sleep": {
                    "total_minutes": 450, "deep_minutes": 90, "light_minutes": 240,
                    "rem_minutes": 90, "awake_minutes": 30, "score": 84
                },
                "captured_at": "2024-01-15T23:00:00Z"
            },
            "phone": {
                "steps": 7000,
                "heart_rate_readings": [
                    { "timestamp": "2024-01-15T08:00:10Z", "value": 80 }
                ],
                "captured_at": "2024-01-15T22:45:00Z"
            }
        },
        "workouts": [
            {
                "id": "run-1", "source_id": "strava", "start": "2024-01-15T12:28:00Z",
                "elapsed_seconds": 300, "average_heart_rate": 150
            }
        ]
    }"#;

    match health_fusion::merge_sources_json(json.to_string()) {
        Ok(merged) => print!("{merged}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}

use serde_json::Value;

/// Headline field of each command's result, first present wins:
/// model runs report EV, audits report consistency, exports report the path.
const HEADLINE_KEYS: [&str; 3] = ["enterprise_value", "consistent", "path"];

/// Print just the key answer: one line per scenario for scenario runs,
/// otherwise the headline field of the result.
pub fn print_minimal(value: &Value) {
    for line in minimal_lines(value) {
        println!("{}", line);
    }
}

fn minimal_lines(value: &Value) -> Vec<String> {
    if let Some(rows) = value.get("comparison").and_then(Value::as_array) {
        return rows
            .iter()
            .map(|row| {
                format!(
                    "{}: {}",
                    plain(row.get("scenario_type")),
                    plain(row.get("enterprise_value"))
                )
            })
            .collect();
    }

    let result = value.get("result").unwrap_or(value);
    let headline = HEADLINE_KEYS
        .iter()
        .find_map(|key| result.get(*key).filter(|v| !v.is_null()));
    match headline {
        Some(v) => vec![plain(Some(v))],
        None => vec![plain(Some(result))],
    }
}

fn plain(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "n/a".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_run_prints_enterprise_value() {
        let value = json!({ "result": { "npv": "-1", "enterprise_value": "2542513.3" } });
        assert_eq!(minimal_lines(&value), vec!["2542513.3"]);
    }

    #[test]
    fn test_scenario_run_prints_one_line_each() {
        let value = json!({
            "result": {},
            "comparison": [
                { "scenario_type": "Base Case", "enterprise_value": "10" },
                { "scenario_type": "Worst Case", "enterprise_value": "4" },
            ],
        });
        assert_eq!(
            minimal_lines(&value),
            vec!["Base Case: 10", "Worst Case: 4"]
        );
    }

    #[test]
    fn test_audit_prints_consistency() {
        let value = json!({ "result": { "consistent": true, "max_drift": "0" } });
        assert_eq!(minimal_lines(&value), vec!["true"]);
    }
}

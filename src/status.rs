use crate::prelude::*;

use serde_json::{Map, Value};

/// Commands whose fields make up the status report, in merge order.
pub const STATUS_COMMANDS: [&str; 2] = ["Q1", "QPIGS"];

/// Runs the status commands and merges their fields into one `key -> [value, unit]` map.
/// Blocking.
pub fn report(session: &InverterSession) -> Result<Map<String, Value>> {
    let mut data = Map::new();

    for name in STATUS_COMMANDS {
        let execution = session.execute(name)?;
        let fields = execution
            .response_map()
            .with_context(|| format!("{} returned no usable response", name))?;
        data.extend(fields);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_q1_and_qpigs() -> Result<()> {
        let session = InverterSession::new(SessionConfig::new("TEST"), Catalog::bundled())?;
        let data = report(&session)?;

        // from Q1
        assert_eq!(data["inverter_temperature"], serde_json::json!([30, "°C"]));
        assert_eq!(data["scc_flag"], serde_json::json!(["SCC communicating", ""]));
        // from QPIGS
        assert_eq!(data["ac_output_voltage"], serde_json::json!([230.0, "V"]));
        assert_eq!(data["is_load_on"], serde_json::json!([true, ""]));
        Ok(())
    }
}

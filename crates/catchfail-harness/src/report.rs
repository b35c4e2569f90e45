//! Serialisable snapshot of a captured failure.

use catchfail_kernel::{Caught, last_captured};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedReport {
    pub failure_type: String,
    /// Type names from the failure's own type up to the root.
    pub lineage: Vec<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl CapturedReport {
    /// Report on whatever the register currently holds.
    pub fn current() -> Option<Self> {
        last_captured().as_ref().map(Self::from)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&Caught> for CapturedReport {
    fn from(caught: &Caught) -> Self {
        let failure_type = caught.failure_type();
        Self {
            failure_type: failure_type.name().to_string(),
            lineage: failure_type.lineage().into_iter().map(String::from).collect(),
            message: caught.message(),
            causes: caught.causes().map(|cause| cause.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catchfail_kernel::{ERROR, Failure, FailureType, catch_call, catch_panic, reset_captured};

    static CONFIG: FailureType = FailureType::new("Config", &ERROR);

    #[derive(Debug, thiserror::Error)]
    #[error("config unreadable")]
    struct ConfigUnreadable {
        #[source]
        cause: std::io::Error,
    }

    impl Failure for ConfigUnreadable {
        fn failure_type(&self) -> &'static FailureType {
            &CONFIG
        }
    }

    #[test]
    fn empty_register_has_no_report() {
        reset_captured();
        assert_eq!(CapturedReport::current(), None);
    }

    #[test]
    fn parse_failure_report() {
        let value: u16 = catch_call(|| "seventy".parse::<u16>()).expect("stored");
        assert_eq!(value, 0);
        let report = CapturedReport::current().expect("report");
        insta::assert_json_snapshot!(report, @r#"
        {
          "failureType": "Parse",
          "lineage": [
            "Parse",
            "Error",
            "Failure"
          ],
          "message": "invalid digit found in string"
        }
        "#);
        reset_captured();
    }

    #[test]
    fn report_lists_causes() {
        catch_call(|| -> Result<(), ConfigUnreadable> {
            Err(ConfigUnreadable {
                cause: std::io::Error::other("permission denied"),
            })
        })
        .expect("stored");
        let report = CapturedReport::current().expect("report");
        insta::assert_json_snapshot!(report, @r#"
        {
          "failureType": "Config",
          "lineage": [
            "Config",
            "Error",
            "Failure"
          ],
          "message": "config unreadable",
          "causes": [
            "permission denied"
          ]
        }
        "#);
        reset_captured();
    }

    #[test]
    fn panic_report_round_trips_through_json() {
        catch_panic(|| -> u8 { panic!("gauge overflow") }).expect("stored");
        let report = CapturedReport::current().expect("report");
        assert_eq!(report.failure_type, "Panic");
        assert_eq!(report.message, "gauge overflow");

        let json = report.to_json().expect("serialise");
        let back: CapturedReport = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, report);
        reset_captured();
    }
}

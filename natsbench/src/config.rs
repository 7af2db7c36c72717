use crate::distribution::Distribution;
use crate::error::{ConfigError, SubscriptionError};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
}

impl FromStr for LogLevel {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "" | "debug" => Ok(LogLevel::Debug),
            _ => Err(ConfigError::UnknownLogLevel(s.to_owned())),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> LevelFilter {
        match level {
            // tracing has no level above error
            LogLevel::Fatal | LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

/// One configured publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherSpec {
    /// Subject to publish to, every `{guid}` is replaced by a fresh uuid on
    /// each send
    pub subject_template: String,
    /// Delay between two sends in milliseconds
    pub interval: Distribution,
    /// Payload size in bytes
    pub payload: Distribution,
}

impl PublisherSpec {
    fn from_value(index: usize, raw: &Value) -> Result<Self, ConfigError> {
        let map = raw.as_mapping().ok_or(ConfigError::InvalidPublisher {
            index,
            reason: "publisher should be a mapping",
        })?;
        let subject_template = match map.get("subject") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                return Err(ConfigError::InvalidPublisher {
                    index,
                    reason: "subject should be a non-empty string",
                })
            }
        };
        let distribution = |field: &'static str| {
            let raw = map.get(field).unwrap_or(&Value::Null);
            Distribution::from_value(raw).map_err(|source| ConfigError::Distribution {
                index,
                field,
                source,
            })
        };
        Ok(PublisherSpec {
            subject_template,
            interval: distribution("interval")?,
            payload: distribution("payload")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberSpec {
    pub subject: String,
}

impl SubscriberSpec {
    pub fn new(subject: &str) -> Result<Self, SubscriptionError> {
        if subject.is_empty() {
            return Err(SubscriptionError::EmptySubject);
        }
        if subject.chars().any(char::is_whitespace) {
            return Err(SubscriptionError::InvalidSubject(subject.to_owned()));
        }
        Ok(SubscriberSpec {
            subject: subject.to_owned(),
        })
    }

    fn from_value(raw: &Value) -> Result<Self, SubscriptionError> {
        match raw.get("subject") {
            Some(Value::String(s)) => SubscriberSpec::new(s),
            _ => Err(SubscriptionError::EmptySubject),
        }
    }
}

/// The workload description, validated as a whole before anything touches
/// the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub broker_uri: String,
    pub pubs: Vec<PublisherSpec>,
    pub subs: Vec<SubscriberSpec>,
    pub logfile: Option<PathBuf>,
    pub loglevel: LogLevel,
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn sequence<'a>(map: &'a Mapping, field: &'static str) -> Result<&'a [Value], ConfigError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(&[][..]),
        Some(Value::Sequence(seq)) => Ok(seq.as_slice()),
        Some(other) => Err(ConfigError::InvalidField {
            field,
            expected: "sequence",
            given: kind_of(other),
        }),
    }
}

fn optional_string<'a>(map: &'a Mapping, field: &'static str) -> Result<Option<&'a str>, ConfigError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ConfigError::InvalidField {
            field,
            expected: "string",
            given: kind_of(other),
        }),
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Config::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Config, ConfigError> {
        let value: Value = serde_yaml::from_str(text)?;
        Config::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Config, ConfigError> {
        let map = value
            .as_mapping()
            .ok_or_else(|| ConfigError::NotAMapping(kind_of(value)))?;

        let broker_uri = match optional_string(map, "broker_uri")? {
            Some(uri) => uri,
            // older workload files spell it `nats_uri`
            None => optional_string(map, "nats_uri")?.ok_or(ConfigError::MissingBrokerUri)?,
        };
        let pubs = sequence(map, "pubs")?
            .iter()
            .enumerate()
            .map(|(index, raw)| PublisherSpec::from_value(index, raw))
            .collect::<Result<Vec<_>, _>>()?;
        let subs = sequence(map, "subs")?
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                SubscriberSpec::from_value(raw)
                    .map_err(|source| ConfigError::Subscription { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let loglevel = optional_string(map, "loglevel")?.unwrap_or("").parse()?;

        Ok(Config {
            broker_uri: broker_uri.to_owned(),
            pubs,
            subs,
            logfile: optional_string(map, "logfile")?.map(PathBuf::from),
            loglevel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DistributionError, RandomParamsError};

    const WORKLOAD: &str = r#"
broker_uri: nats://127.0.0.1:4222
loglevel: INFO
logfile: /tmp/natsbench.log
pubs:
  - subject: "foo.{guid}"
    interval: [random, 10, 100]
    payload: [normal, 1024, 64]
  - subject: bar
    interval: [normal, 1000, 0]
    payload: [random, 1, 1]
subs:
  - subject: foo.>
  - subject: bar
"#;

    #[test]
    fn test_full_workload() {
        let cfg = Config::from_yaml(WORKLOAD).unwrap();
        assert_eq!(cfg.broker_uri, "nats://127.0.0.1:4222");
        assert_eq!(cfg.loglevel, LogLevel::Info);
        assert_eq!(cfg.logfile, Some(PathBuf::from("/tmp/natsbench.log")));
        assert_eq!(cfg.pubs.len(), 2);
        assert_eq!(cfg.pubs[0].subject_template, "foo.{guid}");
        assert_eq!(cfg.pubs[0].interval, Distribution::Uniform { min: 10, max: 100 });
        assert_eq!(
            cfg.pubs[1].interval,
            Distribution::Normal {
                mean: 1000.0,
                variance: 0.0
            }
        );
        assert_eq!(
            cfg.subs,
            vec![
                SubscriberSpec::new("foo.>").unwrap(),
                SubscriberSpec::new("bar").unwrap()
            ]
        );
    }

    #[test]
    fn test_minimal_workload() {
        let cfg = Config::from_yaml("nats_uri: nats://localhost\npubs:\nsubs: []\n").unwrap();
        assert_eq!(cfg.broker_uri, "nats://localhost");
        assert!(cfg.pubs.is_empty());
        assert!(cfg.subs.is_empty());
        assert_eq!(cfg.loglevel, LogLevel::Debug);
        assert_eq!(cfg.logfile, None);
    }

    #[test]
    fn test_not_a_mapping() {
        assert!(matches!(
            Config::from_yaml("- nats://localhost"),
            Err(ConfigError::NotAMapping("sequence"))
        ));
        assert!(matches!(
            Config::from_yaml("just a string"),
            Err(ConfigError::NotAMapping("string"))
        ));
    }

    #[test]
    fn test_missing_broker_uri() {
        assert!(matches!(
            Config::from_yaml("pubs: []"),
            Err(ConfigError::MissingBrokerUri)
        ));
        assert!(matches!(
            Config::from_yaml("broker_uri: 4222"),
            Err(ConfigError::InvalidField {
                field: "broker_uri",
                ..
            })
        ));
    }

    #[test]
    fn test_pubs_and_subs_must_be_sequences() {
        assert!(matches!(
            Config::from_yaml("broker_uri: nats://x\npubs: {subject: foo}"),
            Err(ConfigError::InvalidField {
                field: "pubs",
                expected: "sequence",
                given: "mapping"
            })
        ));
        assert!(matches!(
            Config::from_yaml("broker_uri: nats://x\nsubs: foo"),
            Err(ConfigError::InvalidField { field: "subs", .. })
        ));
    }

    #[test]
    fn test_bad_distribution_is_located() {
        let yaml = r#"
broker_uri: nats://x
pubs:
  - subject: ok
    interval: [random, 1, 2]
    payload: [random, 1, 2]
  - subject: broken
    interval: [random, 1, 2]
    payload: [random, 10, 5]
"#;
        match Config::from_yaml(yaml) {
            Err(ConfigError::Distribution {
                index,
                field,
                source,
            }) => {
                assert_eq!(index, 1);
                assert_eq!(field, "payload");
                assert_eq!(
                    source,
                    DistributionError::InvalidRandomParams(RandomParamsError::MinGreaterThanMax)
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            Config::from_yaml("broker_uri: nats://x\npubs:\n  - subject: a\n    payload: [random, 1, 2]"),
            Err(ConfigError::Distribution {
                field: "interval",
                source: DistributionError::InvalidDistributionKind(_),
                ..
            })
        ));
    }

    #[test]
    fn test_bad_publisher() {
        assert!(matches!(
            Config::from_yaml("broker_uri: nats://x\npubs: [foo]"),
            Err(ConfigError::InvalidPublisher { index: 0, .. })
        ));
        assert!(matches!(
            Config::from_yaml(
                "broker_uri: nats://x\npubs:\n  - interval: [random, 1, 2]\n    payload: [random, 1, 2]"
            ),
            Err(ConfigError::InvalidPublisher { index: 0, .. })
        ));
    }

    #[test]
    fn test_bad_subscriber() {
        for subs in ["[{subject: ''}]", "[{}]", "[{subject: 12}]", "[foo]"].iter() {
            let yaml = format!("broker_uri: nats://x\nsubs: {}", subs);
            assert!(
                matches!(
                    Config::from_yaml(&yaml),
                    Err(ConfigError::Subscription {
                        index: 0,
                        source: SubscriptionError::EmptySubject
                    })
                ),
                "{}",
                subs
            );
        }
        assert_eq!(
            SubscriberSpec::new("foo bar").unwrap_err(),
            SubscriptionError::InvalidSubject("foo bar".to_owned())
        );
    }

    #[test]
    fn test_log_levels() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("fatal".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
        assert!(matches!(
            Config::from_yaml("broker_uri: nats://x\nloglevel: chatty"),
            Err(ConfigError::UnknownLogLevel(l)) if l == "chatty"
        ));
        assert_eq!(LevelFilter::from(LogLevel::Fatal), LevelFilter::ERROR);
    }
}

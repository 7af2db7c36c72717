use crate::broker::BrokerError;
use crate::scheduler::SchedulerFault;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RandomParamsError {
    #[error("random distribution should have [random, {{min}}, {{max}}] format")]
    NotNumeric,
    #[error("min cannot be greater than max for random distribution")]
    MinGreaterThanMax,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistributionError {
    #[error("supported distributions are: normal, random ({0} given)")]
    InvalidDistributionKind(String),
    #[error("normal distribution should have [normal, {{mean}}, {{variance}}] format")]
    InvalidNormalParams,
    #[error(transparent)]
    InvalidRandomParams(#[from] RandomParamsError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("invalid subscription, subject should be a non-empty string")]
    EmptySubject,
    #[error("invalid subscription, subject `{0}` contains whitespace")]
    InvalidSubject(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config format, mapping expected, {0} given")]
    NotAMapping(&'static str),
    #[error("broker URI is missing")]
    MissingBrokerUri,
    #[error("'{field}' should be a {expected}, {given} given")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
        given: &'static str,
    },
    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),
    #[error("publisher #{index}: {reason}")]
    InvalidPublisher { index: usize, reason: &'static str },
    #[error("publisher #{index} {field}: {source}")]
    Distribution {
        index: usize,
        field: &'static str,
        source: DistributionError,
    },
    #[error("subscriber #{index}: {source}")]
    Subscription {
        index: usize,
        source: SubscriptionError,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Fault(#[from] SchedulerFault),
    #[error("failed to set up logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

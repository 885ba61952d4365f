//! Output conventions negotiated with the host.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Channel that receives error text when an operation fails.
///
/// `Stdout` is the legacy single-channel behaviour: success and error text
/// share standard output and the process always exits successfully.
/// `Stderr` leaves standard output empty on failure, writes the error to
/// standard error and exits with a failure status.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ErrorChannel {
    /// Errors share standard output with results.
    #[default]
    Stdout,
    /// Errors go to standard error with a non-zero exit status.
    Stderr,
}

/// Encoding used for the capability manifest.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ManifestFormat {
    /// Compact JSON on a single line.
    #[default]
    Json,
    /// YAML document.
    Yaml,
}

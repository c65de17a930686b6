// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builder::BuilderId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("loops are not allowed in builder parents")]
    ParentCycle,

    #[error("{0} does not belong to this builder set")]
    UnknownBuilder(BuilderId),

    #[error("certificate source `{source_name}` failed: {message}")]
    CertificateSource {
        source_name: String,
        message: String,
    },

    #[error("trust manager construction failed: {0}")]
    TrustManager(String),

    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("invalid pin: {0}")]
    InvalidPin(String),

    #[error("the default policy has already been installed")]
    DefaultPolicyAlreadyInstalled,
}

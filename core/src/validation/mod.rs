//! Independent verification of flow results
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

pub mod correctness;

pub use self::correctness::{CertificateReport, CertificateViolation, FlowCertificate, FlowView};

//! Validity window of the CA certificate embedded in a cluster kubeconfig

use crate::error::{ExporterError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Not-before / not-after instants as Unix seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CertificateValidity {
    pub not_before: i64,
    pub not_after: i64,
}

/// Decode a base64 blob holding either a PEM-wrapped or raw DER certificate
pub fn validity_from_base64(encoded: &str) -> Result<CertificateValidity> {
    let compact: String = encoded.split_whitespace().collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| ExporterError::Certificate(format!("failed to decode base64: {e}")))?;

    let der = rustls_pemfile::certs(&mut bytes.as_slice())
        .map_err(|e| ExporterError::Certificate(format!("failed to read PEM: {e}")))?
        .into_iter()
        .next()
        .unwrap_or(bytes);

    validity_from_der(&der)
}

pub fn validity_from_der(der: &[u8]) -> Result<CertificateValidity> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| ExporterError::Certificate(format!("failed to parse certificate: {e}")))?;

    let validity = cert.validity();
    Ok(CertificateValidity {
        not_before: validity.not_before.timestamp(),
        not_after: validity.not_after.timestamp(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const NOT_BEFORE: i64 = 1_704_067_200;
    pub(crate) const NOT_AFTER: i64 = 2_019_686_400;

    /// Self-signed certificate valid 2024-01-01 .. 2034-01-01
    pub(crate) fn test_certificate() -> rcgen::Certificate {
        let mut params = rcgen::CertificateParams::new(vec!["cluster-1".to_string()]);
        params.not_before = rcgen::date_time_ymd(2024, 1, 1);
        params.not_after = rcgen::date_time_ymd(2034, 1, 1);
        rcgen::Certificate::from_params(params).unwrap()
    }

    pub(crate) fn pem_base64() -> String {
        STANDARD.encode(test_certificate().serialize_pem().unwrap())
    }

    #[test]
    fn test_pem_wrapped_certificate() {
        let validity = validity_from_base64(&pem_base64()).unwrap();
        assert_eq!(validity.not_before, NOT_BEFORE);
        assert_eq!(validity.not_after, NOT_AFTER);
    }

    #[test]
    fn test_raw_der_certificate() {
        let der = test_certificate().serialize_der().unwrap();
        let validity = validity_from_base64(&STANDARD.encode(der)).unwrap();
        assert_eq!(
            validity,
            CertificateValidity {
                not_before: NOT_BEFORE,
                not_after: NOT_AFTER,
            }
        );
    }

    #[test]
    fn test_base64_with_line_breaks() {
        let encoded = pem_base64();
        let wrapped: String = encoded
            .as_bytes()
            .chunks(64)
            .map(|c| format!("{}\n", String::from_utf8_lossy(c)))
            .collect();
        assert!(validity_from_base64(&wrapped).is_ok());
    }

    #[test]
    fn test_invalid_base64() {
        let err = validity_from_base64("***").unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn test_garbage_certificate() {
        let err = validity_from_base64(&STANDARD.encode(b"not a certificate")).unwrap_err();
        assert!(matches!(err, ExporterError::Certificate(_)));
    }
}

//! Fiat to satoshi conversion

use crate::backend::PriceSource;
use dsprobe_core::{Error, Result, Sats, SATS_PER_BTC};
use std::sync::Arc;
use tracing::info;

/// Outcome of a conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub sats: Sats,
    /// BTC/USD rate the conversion used
    pub rate: f64,
}

/// Parse an operator-typed USD amount
pub fn parse_usd(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidAmount("empty amount".to_string()));
    }
    let amount: f64 = trimmed
        .parse()
        .map_err(|_| Error::InvalidAmount(trimmed.to_string()))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount(trimmed.to_string()));
    }
    Ok(amount)
}

/// `floor(usd / rate * 1e8)`
pub fn usd_to_sats(usd: f64, rate: f64) -> Result<Sats> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(Error::RateUnavailable);
    }
    let sats = (usd / rate * SATS_PER_BTC).floor();
    if !sats.is_finite() || sats < 0.0 || sats > Sats::MAX as f64 {
        return Err(Error::InvalidAmount(usd.to_string()));
    }
    Ok(sats as Sats)
}

/// Converts USD amounts using a live rate. Advisory: callers may skip it.
pub struct AmountConverter {
    source: Arc<dyn PriceSource>,
}

impl AmountConverter {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self { source }
    }

    pub async fn convert(&self, usd: &str) -> Result<Conversion> {
        let amount = parse_usd(usd)?;

        let rate = self
            .source
            .btc_usd()
            .await?
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or(Error::RateUnavailable)?;

        let sats = usd_to_sats(amount, rate)?;
        info!(usd = amount, rate, sats, "Converted USD to sats");
        Ok(Conversion { sats, rate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPriceSource;

    fn converter(rate: Option<f64>) -> (Arc<MockPriceSource>, AmountConverter) {
        let source = Arc::new(MockPriceSource::new(rate));
        (source.clone(), AmountConverter::new(source))
    }

    #[tokio::test]
    async fn test_ten_dollars_at_fifty_thousand() {
        let (_, conv) = converter(Some(50_000.0));
        let result = conv.convert("10").await.unwrap();
        assert_eq!(result.sats, 20_000);
        assert_eq!(result.rate, 50_000.0);
    }

    #[tokio::test]
    async fn test_result_is_floored() {
        let (_, conv) = converter(Some(63_000.0));
        // 1 / 63000 * 1e8 = 1587.30...
        assert_eq!(conv.convert("1").await.unwrap().sats, 1587);
    }

    #[tokio::test]
    async fn test_non_numeric_input_skips_rate_fetch() {
        let (source, conv) = converter(Some(50_000.0));
        assert!(matches!(
            conv.convert("abc").await.unwrap_err(),
            Error::InvalidAmount(_)
        ));
        assert!(matches!(
            conv.convert("").await.unwrap_err(),
            Error::InvalidAmount(_)
        ));
        assert!(matches!(
            conv.convert("NaN").await.unwrap_err(),
            Error::InvalidAmount(_)
        ));
        assert!(matches!(
            conv.convert("-5").await.unwrap_err(),
            Error::InvalidAmount(_)
        ));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_rate_unavailable() {
        let (_, conv) = converter(Some(0.0));
        assert_eq!(conv.convert("10").await.unwrap_err(), Error::RateUnavailable);
    }

    #[tokio::test]
    async fn test_missing_rate_unavailable() {
        let (_, conv) = converter(None);
        assert_eq!(conv.convert("10").await.unwrap_err(), Error::RateUnavailable);
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let source = Arc::new(MockPriceSource::with_result(Err(Error::transport(
            "dns failure",
        ))));
        let conv = AmountConverter::new(source);
        assert_eq!(
            conv.convert("10").await.unwrap_err(),
            Error::transport("dns failure")
        );
    }

    #[test]
    fn test_usd_to_sats_overflow() {
        assert!(matches!(
            usd_to_sats(1e300, 1e-10),
            Err(Error::InvalidAmount(_))
        ));
    }
}

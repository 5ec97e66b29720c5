//! Full document height estimation
//!
//! Engines and layouts disagree about document height, so several
//! independent measurements are taken and the largest one wins.

use crate::driver::BrowserDriver;
use serde_json::Value;
use tracing::debug;

/// Hard ceiling for the estimated height
pub const DEFAULT_MAX_HEIGHT: u32 = 30_000;

/// Height measurements, evaluated in order
pub const HEIGHT_PROBES: [&str; 4] = [
    "document.body.parentNode.scrollHeight",
    "document.documentElement.scrollHeight",
    "document.body.scrollHeight",
    "Math.max(document.body.scrollHeight, document.body.offsetHeight, \
     document.documentElement.clientHeight, document.documentElement.scrollHeight, \
     document.documentElement.offsetHeight)",
];

/// Interpret one probe result as a pixel height
///
/// Only finite, non-negative JSON numbers count; fractions are truncated.
pub fn probe_value(value: &Value) -> Option<u32> {
    let number = value.as_f64()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    Some(number.trunc().min(f64::from(u32::MAX)) as u32)
}

/// Combine probe results into one height
///
/// The tallest valid probe, capped at `max_height` and never below
/// `viewport_height`. With no valid probe the viewport height is returned.
pub fn combine_probes<I>(samples: I, viewport_height: u32, max_height: u32) -> u32
where
    I: IntoIterator<Item = Option<u32>>,
{
    match samples.into_iter().flatten().max() {
        Some(tallest) => tallest.min(max_height).max(viewport_height),
        None => viewport_height,
    }
}

/// Estimate the full scrollable height of the page in `driver`
pub async fn estimate_full_height(driver: &dyn BrowserDriver, viewport_height: u32, max_height: u32) -> u32 {
    let mut samples = Vec::with_capacity(HEIGHT_PROBES.len());

    for probe in HEIGHT_PROBES {
        let sample = match driver.execute_script(probe).await {
            Ok(value) => {
                let height = probe_value(&value);
                if height.is_none() {
                    debug!("Height probe returned non-numeric value {}: {}", value, probe);
                }
                height
            }
            Err(e) => {
                debug!("Height probe failed ({}): {}", probe, e);
                None
            }
        };
        samples.push(sample);
    }

    let height = combine_probes(samples.iter().copied(), viewport_height, max_height);
    debug!("Estimated page height {}px from probes {:?}", height, samples);
    height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockBrowser;

    #[test]
    fn test_probe_value() {
        assert_eq!(probe_value(&Value::from(2400)), Some(2400));
        assert_eq!(probe_value(&Value::from(2400.9)), Some(2400));
        assert_eq!(probe_value(&Value::from(-3)), None);
        assert_eq!(probe_value(&Value::from("2400")), None);
        assert_eq!(probe_value(&Value::Null), None);
        assert_eq!(probe_value(&Value::Bool(true)), None);
    }

    #[test]
    fn test_combine_takes_maximum() {
        let samples = [Some(1500), None, Some(4200), Some(3000)];
        assert_eq!(combine_probes(samples, 1080, DEFAULT_MAX_HEIGHT), 4200);
    }

    #[test]
    fn test_combine_caps_at_ceiling() {
        let samples = [Some(120_000), Some(2000)];
        assert_eq!(combine_probes(samples, 1080, DEFAULT_MAX_HEIGHT), 30_000);
    }

    #[test]
    fn test_combine_floors_at_viewport() {
        assert_eq!(combine_probes([Some(300), Some(500)], 1080, DEFAULT_MAX_HEIGHT), 1080);
    }

    #[test]
    fn test_combine_without_valid_probes() {
        assert_eq!(combine_probes([None, None, None, None], 1080, DEFAULT_MAX_HEIGHT), 1080);
        assert_eq!(combine_probes(std::iter::empty(), 900, DEFAULT_MAX_HEIGHT), 900);
    }

    #[test]
    fn test_combine_maximum_property() {
        // Any sample set holding a value >= viewport yields max(valid) capped at the ceiling
        let cases: Vec<Vec<Option<u32>>> = vec![
            vec![Some(1080)],
            vec![None, Some(1081), Some(17)],
            vec![Some(29_999), Some(30_000), None],
            vec![Some(30_001)],
            vec![Some(5_000), Some(2_000_000)],
        ];
        for samples in cases {
            let expected = samples.iter().flatten().max().copied().unwrap().min(DEFAULT_MAX_HEIGHT);
            assert_eq!(combine_probes(samples.clone(), 1080, DEFAULT_MAX_HEIGHT), expected, "{:?}", samples);
        }
    }

    #[tokio::test]
    async fn test_estimate_swallows_probe_failures() {
        let browser = MockBrowser::new()
            .with_script(HEIGHT_PROBES[1], Value::from(2600))
            .with_script(HEIGHT_PROBES[2], Value::from("tall"));

        let height = estimate_full_height(&browser, 1080, DEFAULT_MAX_HEIGHT).await;
        assert_eq!(height, 2600);
        assert_eq!(browser.calls().scripts.len(), HEIGHT_PROBES.len());
    }

    #[tokio::test]
    async fn test_estimate_all_probes_fail() {
        let browser = MockBrowser::new();
        assert_eq!(estimate_full_height(&browser, 1080, DEFAULT_MAX_HEIGHT).await, 1080);
    }
}

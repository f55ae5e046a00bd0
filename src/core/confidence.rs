/// Arithmetic mean of `values`, or `None` when there are none.
pub fn mean_confidence(values: impl IntoIterator<Item = f32>) -> Option<f32> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0f64, 0usize), |(sum, count), v| (sum + f64::from(v), count + 1));
    (count > 0).then(|| (sum / count as f64) as f32)
}

/// Integer percentage as written by hOCR (`x_wconf`) and the WordStr box
/// format. Truncates, matching the engine's own renderers.
pub fn as_percent(confidence: f32) -> u32 {
    confidence.clamp(0.0, 100.0) as u32
}

/// Fraction in `0.0..=1.0`, as used by ALTO's `WC` attribute.
pub fn as_fraction(confidence: f32) -> f32 {
    confidence.clamp(0.0, 100.0) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_values() {
        assert_eq!(mean_confidence([90.0, 80.0, 70.0]), Some(80.0));
        assert_eq!(mean_confidence(std::iter::empty()), None);
    }

    #[test]
    fn clamps_out_of_range_scores() {
        assert_eq!(as_percent(96.9), 96);
        assert_eq!(as_percent(-1.0), 0);
        assert_eq!(as_percent(140.0), 100);
        assert_eq!(as_fraction(50.0), 0.5);
    }
}

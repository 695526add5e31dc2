//! Threshold colour scale shared by the county fills and the legend.

/// Ascending bucket boundaries, in percent.
pub const THRESHOLDS: [f64; 4] = [15.0, 30.0, 45.0, 60.0];

/// One colour per bucket, lightest first.
pub const COLORS: [&str; 5] = ["#f7fbff", "#c6dbef", "#6baed6", "#2171b5", "#08306b"];

/// Fill for counties with no education record.
pub const FALLBACK_COLOR: &str = "#ccc";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorBucket {
    pub lower_bound: f64,
    pub color: &'static str,
    pub label: &'static str,
}

pub const BUCKETS: [ColorBucket; 5] = [
    ColorBucket { lower_bound: 0.0, color: COLORS[0], label: "< 15%" },
    ColorBucket { lower_bound: THRESHOLDS[0], color: COLORS[1], label: "15% - 30%" },
    ColorBucket { lower_bound: THRESHOLDS[1], color: COLORS[2], label: "30% - 45%" },
    ColorBucket { lower_bound: THRESHOLDS[2], color: COLORS[3], label: "45% - 60%" },
    ColorBucket { lower_bound: THRESHOLDS[3], color: COLORS[4], label: "> 60%" },
];

/// Number of thresholds at or below `percentage`. A value exactly on a
/// boundary belongs to the bucket that starts there; NaN lands in bucket 0.
pub fn bucket_index(percentage: f64) -> usize {
    THRESHOLDS.iter().take_while(|&&t| t <= percentage).count()
}

pub fn classify(percentage: f64) -> &'static str {
    COLORS[bucket_index(percentage)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_values() {
        assert_eq!(classify(22.5), "#c6dbef");
        assert_eq!(classify(61.0), "#08306b");
        assert_eq!(classify(3.2), "#f7fbff");
        assert_eq!(classify(100.0), "#08306b");
    }

    #[test]
    fn boundaries_belong_to_the_upper_bucket() {
        for (i, t) in THRESHOLDS.iter().enumerate() {
            assert_eq!(bucket_index(*t), i + 1);
            assert_eq!(bucket_index(t - 1e-9), i);
        }
    }

    #[test]
    fn darkness_never_decreases() {
        let mut last = 0;
        for step in 0..=2000 {
            let p = step as f64 * 0.05;
            let idx = bucket_index(p);
            assert!(idx >= last, "bucket dropped at {p}");
            last = idx;
        }
        assert_eq!(last, COLORS.len() - 1);
    }

    #[test]
    fn legend_buckets_agree_with_classifier() {
        for bucket in BUCKETS {
            assert_eq!(classify(bucket.lower_bound), bucket.color, "{}", bucket.label);
        }
        assert!(BUCKETS.windows(2).all(|w| w[0].lower_bound < w[1].lower_bound));
    }

    #[test]
    fn nan_maps_to_lightest() {
        assert_eq!(classify(f64::NAN), COLORS[0]);
        assert_eq!(classify(-5.0), COLORS[0]);
    }
}

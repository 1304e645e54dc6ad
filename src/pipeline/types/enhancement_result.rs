use crate::pipeline::orchestration::stage_timings::StageTimings;
use bytes::Bytes;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedRating {
    Optimal,
    Efficient,
    Acceptable,
    Suboptimal,
}

impl SpeedRating {
    pub fn from_millis(elapsed_millis: u64) -> Self {
        match elapsed_millis {
            0..1000 => SpeedRating::Optimal,
            1000..3000 => SpeedRating::Efficient,
            3000..5000 => SpeedRating::Acceptable,
            _ => SpeedRating::Suboptimal,
        }
    }
}

/// The settled output of a successful request. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct EnhancementResult {
    pub request_id: Uuid,
    pub enhanced_image: Bytes,
    pub enhanced_size_bytes: Option<u64>,
    pub elapsed_millis: u64,
    pub stage_timings: StageTimings,
}

impl EnhancementResult {
    /// Relative size change against the original, in percent.
    pub fn size_change_percent(&self, original_size_bytes: u64) -> Option<f64> {
        let enhanced = self.enhanced_size_bytes?;
        if original_size_bytes == 0 {
            return None;
        }
        let original = original_size_bytes as f64;
        Some((enhanced as f64 - original) / original * 100.0)
    }

    pub fn speed_rating(&self) -> SpeedRating {
        SpeedRating::from_millis(self.elapsed_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(enhanced_size_bytes: Option<u64>, elapsed_millis: u64) -> EnhancementResult {
        EnhancementResult {
            request_id: Uuid::new_v4(),
            enhanced_image: Bytes::from_static(b"png"),
            enhanced_size_bytes,
            elapsed_millis,
            stage_timings: StageTimings::new(),
        }
    }

    #[test]
    fn size_change_against_original() {
        let result = result(Some(300), 10);
        assert_eq!(result.size_change_percent(100), Some(200.0));
        assert_eq!(result.size_change_percent(0), None);
    }

    #[test]
    fn size_change_needs_enhanced_size() {
        assert_eq!(result(None, 10).size_change_percent(100), None);
    }

    #[test]
    fn speed_rating_thresholds() {
        assert_eq!(result(None, 999).speed_rating(), SpeedRating::Optimal);
        assert_eq!(result(None, 1000).speed_rating(), SpeedRating::Efficient);
        assert_eq!(result(None, 4999).speed_rating(), SpeedRating::Acceptable);
        assert_eq!(result(None, 5000).speed_rating(), SpeedRating::Suboptimal);
    }
}

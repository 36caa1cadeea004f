use crate::structs::toml::LimitOptions;

/// Sentinel for "no limit configured"
pub const NO_LIMIT: u64 = u64::MAX;

/// Collection quotas for one scope (the whole run or a single sample spec),
/// with running accumulators and sticky reached flags
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_sample_count: u64,
    pub max_bytes_per_sample: u64,
    pub max_bytes_total: u64,
    pub ignore_limits: bool,
    pub accumulated_count: u64,
    pub accumulated_bytes_total: u64,
    pub count_reached: bool,
    pub per_sample_reached: bool,
    pub total_reached: bool,
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            max_sample_count: NO_LIMIT,
            max_bytes_per_sample: NO_LIMIT,
            max_bytes_total: NO_LIMIT,
            ignore_limits: false,
            accumulated_count: 0,
            accumulated_bytes_total: 0,
            count_reached: false,
            per_sample_reached: false,
            total_reached: false,
        }
    }
}

impl Limits {
    pub fn from_options(options: &Option<LimitOptions>) -> Limits {
        let Some(options) = options else {
            return Limits::default();
        };
        Limits {
            max_sample_count: options.max_sample_count.unwrap_or(NO_LIMIT),
            max_bytes_per_sample: options.max_bytes_per_sample.unwrap_or(NO_LIMIT),
            max_bytes_total: options.max_bytes_total.unwrap_or(NO_LIMIT),
            ignore_limits: options.ignore_limits.unwrap_or(false),
            ..Limits::default()
        }
    }

    /// Account for one accepted sample
    pub(crate) fn record_sample(&mut self, data_size: u64) {
        self.accumulated_count += 1;
        self.accumulated_bytes_total += data_size;
    }
}

/// Outcome of classifying one candidate sample against the quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStatus {
    NoLimits,
    SampleWithinLimits,
    GlobalSampleCountLimitReached,
    LocalSampleCountLimitReached,
    GlobalMaxBytesPerSample,
    GlobalMaxBytesTotal,
    LocalMaxBytesPerSample,
    LocalMaxBytesTotal,
    FailedToComputeLimits,
}

impl LimitStatus {
    /// Statuses that still allow the sample payload to be collected
    pub fn within_limits(&self) -> bool {
        matches!(self, LimitStatus::NoLimits | LimitStatus::SampleWithinLimits)
    }
}

/// Classify a candidate of `data_size` bytes against the global and the
/// governing spec's quotas. The evaluation order is part of the contract:
/// count limits dominate byte limits and global dominates local. An unknown
/// size cannot be accounted and is rejected
pub fn classify(global: &Limits, local: &Limits, data_size: Option<u64>) -> LimitStatus {
    if global.ignore_limits {
        return LimitStatus::NoLimits;
    }

    let Some(data_size) = data_size else {
        return LimitStatus::FailedToComputeLimits;
    };

    // Sample count reached?
    if global.max_sample_count != NO_LIMIT
        && global.accumulated_count >= global.max_sample_count
    {
        return LimitStatus::GlobalSampleCountLimitReached;
    }

    if local.max_sample_count != NO_LIMIT && local.accumulated_count >= local.max_sample_count {
        return LimitStatus::LocalSampleCountLimitReached;
    }

    // Global byte limits
    if global.max_bytes_per_sample != NO_LIMIT && data_size > global.max_bytes_per_sample {
        return LimitStatus::GlobalMaxBytesPerSample;
    }

    if global.max_bytes_total != NO_LIMIT
        && data_size + global.accumulated_bytes_total > global.max_bytes_total
    {
        return LimitStatus::GlobalMaxBytesTotal;
    }

    // Local byte limits
    if local.max_bytes_per_sample != NO_LIMIT && data_size > local.max_bytes_per_sample {
        return LimitStatus::LocalMaxBytesPerSample;
    }

    if local.max_bytes_total != NO_LIMIT
        && data_size + local.accumulated_bytes_total > local.max_bytes_total
    {
        return LimitStatus::LocalMaxBytesTotal;
    }

    LimitStatus::SampleWithinLimits
}

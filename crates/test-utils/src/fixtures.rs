//! Common test fixtures for coordinate indexing tests.
//!
//! This module provides pre-defined values that represent common
//! forecast-collection layouts.

/// Reference dates.
pub mod time {
    use chrono::{DateTime, TimeZone, Utc};

    /// Reference time for synthetic collections
    pub const REFERENCE_TIME: &str = "2024-01-15T00:00:00Z";

    /// [`REFERENCE_TIME`] as a date.
    pub fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    /// A date just before midnight, for slop and rounding checks
    pub fn before_midnight() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2010, 3, 28, 23, 59, 59).unwrap()
    }
}

pub use time::reference_time;

/// Model cycle layouts.
pub mod cycles {
    /// Shape of a model's run × offset grid.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CycleSpec {
        /// Number of runtimes
        pub nruns: usize,
        /// Hours between runtimes
        pub run_spacing: i64,
        /// Number of forecast offsets per run
        pub ntimes: usize,
        /// Hours between offsets
        pub time_step: i32,
    }

    impl CycleSpec {
        /// Records in a full run × offset grid.
        pub fn size(&self) -> usize {
            self.nruns * self.ntimes
        }
    }

    /// Four runs a day, three-hourly offsets to 48 hours.
    pub const GFS_LIKE: CycleSpec = CycleSpec {
        nruns: 4,
        run_spacing: 6,
        ntimes: 17,
        time_step: 3,
    };

    /// Twelve runs six hours apart.
    pub const SIX_HOURLY_12: CycleSpec = CycleSpec {
        nruns: 12,
        run_spacing: 6,
        ntimes: 12,
        time_step: 6,
    };

    /// Four daily runs.
    pub const DAILY_4: CycleSpec = CycleSpec {
        nruns: 4,
        run_spacing: 24,
        ntimes: 12,
        time_step: 24,
    };

    /// Hourly runs, hourly offsets.
    pub const HOURLY: CycleSpec = CycleSpec {
        nruns: 24,
        run_spacing: 1,
        ntimes: 19,
        time_step: 1,
    };
}

/// Vertical level sets.
pub mod levels {
    /// Level type code for isobaric surfaces
    pub const ISOBARIC_CODE: i32 = 100;

    /// Level type code for height above ground
    pub const HEIGHT_CODE: i32 = 103;

    /// Common isobaric levels in hPa
    pub const ISOBARIC_HPA: [f64; 8] = [1000.0, 925.0, 850.0, 700.0, 500.0, 300.0, 250.0, 200.0];

    /// Common height-above-ground levels in m
    pub const HEIGHT_M: [f64; 3] = [2.0, 10.0, 80.0];
}

/// Configuration documents.
pub mod config {
    /// Every key set
    pub const FULL_YAML: &str = "\
duplicate_policy: last
prefer_orthogonal: false
min_density: 0.5
parallel_scan: false
";

    /// Only one key set
    pub const PARTIAL_YAML: &str = "min_density: 0.25\n";

    /// Density outside [0, 1]
    pub const INVALID_YAML: &str = "min_density: 2.0\n";
}

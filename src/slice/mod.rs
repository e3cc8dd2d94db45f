//! Network slices: traffic classes, per-class parameters, slices and their orchestration,
//! plus unmarked background traffic.

mod background;
mod class;
mod error;
mod export;
mod instance;
mod orchestrator;
mod params;
mod report;

pub use background::{
    BackgroundConfig, BackgroundReport, BackgroundTraffic, Burst, BACKGROUND_BASE_PORT,
};
pub use class::SliceType;
pub use error::SliceError;
pub use export::{sort_rows, write_owd_csv, OwdRow, OWD_CSV_HEADER};
pub use orchestrator::{OrchestratorConfig, PairSelection, SliceOrchestrator};
pub use params::{ClassParams, ClassParamsTable, MAX_APP_RATE_MBPS, MIN_APP_RATE_MBPS};
pub use report::{OwdSummary, SliceReport};
pub use instance::{
    base_port, AppPair, Slice, SliceConfig, BASE_PORT, MAX_APPS_PER_SLICE, PORT_STRIDE, SOURCE_DRAIN,
};

mod discovery;
mod report;

pub use discovery::{DiscoveredFlow, FlowDiscovery, FlowSelector};
pub use report::ReportStore;

pub mod bandit;
pub mod intelligence;
pub mod momentum_detector;
pub mod sampler;
pub mod variance_analyzer;

pub use bandit::{is_success, AppliedOutcome, BanditSelector};
pub use intelligence::IntelligenceAggregator;
pub use momentum_detector::MomentumDetector;
pub use sampler::ThompsonSampler;
pub use variance_analyzer::VarianceAnalyzer;

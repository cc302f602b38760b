pub mod assets;
pub mod brand_voice;
pub mod ddl;
pub mod jobs;
pub mod ledger;
pub mod metadata;
pub mod notifications;
pub mod rate_limit;
pub mod users;

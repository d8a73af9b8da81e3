mod assume_role;
pub use assume_role::AssumeRoleCredentialProvider;

mod chain;
pub use chain::ProvideCredentialChain;

mod default;
pub use default::DefaultCredentialProvider;

mod env;
pub use env::EnvCredentialProvider;

mod instance_metadata;
pub use instance_metadata::InstanceMetadataCredentialProvider;

mod profile;
pub use profile::ProfileCredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;

mod utils;

use crate::constants::{AWS_CONFIG_FILE, AWS_PROFILE, AWS_SHARED_CREDENTIALS_FILE};
use crate::provide_credential::AssumeRoleCredentialProvider;
use crate::sign_request::RequestSigner;
use crate::Credential;
use async_trait::async_trait;
use ini::Ini;
use log::{debug, warn};
use streamsign_core::{Context, ProvideCredential, Result, Signer};
use std::collections::{HashMap, HashSet};

/// ProfileCredentialProvider loads AWS credentials from the shared
/// credentials and config files.
///
/// File locations:
/// - `~/.aws/credentials` (or `AWS_SHARED_CREDENTIALS_FILE`)
/// - `~/.aws/config` (or `AWS_CONFIG_FILE`)
///
/// Both files are merged additively: the credentials file is read first and
/// the first occurrence of a profile wins, a later file never overrides an
/// already-loaded profile. Config file section names carry a `profile `
/// prefix which is stripped on load.
///
/// A profile holding `role_arn` + `source_profile` is resolved by walking
/// the source chain down to a profile with static keys and calling STS
/// AssumeRole for every hop on the way back up. Revisiting a profile while
/// walking means the chain is circular; resolution stops and yields no
/// credentials.
///
/// The profile to use is determined by:
/// 1. The `AWS_PROFILE` environment variable
/// 2. The profile specified via `with_profile()`
/// 3. Default to "default"
#[derive(Debug)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
    sts_region: Option<String>,
}

type Profiles = HashMap<String, HashMap<String, String>>;

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self {
            profile: "default".to_string(),
            config_file: None,
            credentials_file: None,
            sts_region: None,
        }
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    /// Set the region used to sign STS AssumeRole calls for profiles that
    /// reference a role.
    pub fn with_sts_region(mut self, region: impl Into<String>) -> Self {
        self.sts_region = Some(region.into());
        self
    }

    async fn read_ini(&self, ctx: &Context, path: &str) -> Option<Ini> {
        let expanded = if path.starts_with("~/") {
            match ctx.expand_home_dir(path) {
                Some(expanded) => expanded,
                None => {
                    debug!("failed to expand homedir for path: {path}");
                    return None;
                }
            }
        } else {
            path.to_string()
        };

        let content = match ctx.file_read(&expanded).await {
            Ok(content) => content,
            Err(err) => {
                debug!("failed to read profile file {expanded}: {err:?}");
                return None;
            }
        };

        match Ini::load_from_str(&String::from_utf8_lossy(&content)) {
            Ok(conf) => Some(conf),
            Err(err) => {
                // A broken file contributes no profiles instead of breaking
                // the whole chain.
                warn!("failed to parse profile file {expanded}: {err}");
                None
            }
        }
    }

    /// Load every profile from both files, first occurrence wins.
    async fn load_profiles(&self, ctx: &Context) -> Profiles {
        let mut profiles = Profiles::new();

        let credentials_path = self
            .credentials_file
            .clone()
            .or_else(|| ctx.env_var(AWS_SHARED_CREDENTIALS_FILE))
            .unwrap_or_else(|| "~/.aws/credentials".to_string());
        if let Some(conf) = self.read_ini(ctx, &credentials_path).await {
            merge_profiles(&mut profiles, &conf, false);
        }

        let config_path = self
            .config_file
            .clone()
            .or_else(|| ctx.env_var(AWS_CONFIG_FILE))
            .unwrap_or_else(|| "~/.aws/config".to_string());
        if let Some(conf) = self.read_ini(ctx, &config_path).await {
            merge_profiles(&mut profiles, &conf, true);
        }

        profiles
    }

    async fn assume_role_hop(
        &self,
        ctx: &Context,
        hop: &RoleHop,
        source: Credential,
    ) -> Result<Option<Credential>> {
        let region = hop
            .region
            .clone()
            .or_else(|| self.sts_region.clone())
            .unwrap_or_else(|| "us-east-1".to_string());

        let sts_signer = Signer::new(
            ctx.clone(),
            source,
            RequestSigner::new("sts", &region),
        );
        let mut provider = AssumeRoleCredentialProvider::new(hop.role_arn.clone(), sts_signer);
        if let Some(name) = &hop.session_name {
            provider = provider.with_role_session_name(name.clone());
        }
        if let Some(id) = &hop.external_id {
            provider = provider.with_external_id(id.clone());
        }
        if hop.region.is_some() || self.sts_region.is_some() {
            provider = provider
                .with_region(region)
                .with_regional_sts_endpoint();
        }

        provider.provide_credential(ctx).await
    }
}

/// One role-assumption step of a source-profile chain.
#[derive(Debug)]
struct RoleHop {
    role_arn: String,
    session_name: Option<String>,
    external_id: Option<String>,
    region: Option<String>,
}

fn merge_profiles(profiles: &mut Profiles, conf: &Ini, strip_prefix: bool) {
    for (section, props) in conf.iter() {
        let Some(section) = section else {
            continue;
        };
        let name = if strip_prefix {
            section.strip_prefix("profile ").unwrap_or(section)
        } else {
            section
        };

        profiles.entry(name.to_string()).or_insert_with(|| {
            props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        });
    }
}

fn static_credential(props: &HashMap<String, String>) -> Option<Credential> {
    let access_key_id = props.get("aws_access_key_id")?;
    let secret_access_key = props.get("aws_secret_access_key")?;

    let mut cred = Credential::new(access_key_id, secret_access_key);
    if let Some(token) = props.get("aws_session_token") {
        cred = cred.with_session_token(token);
    }
    Some(cred)
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profiles = self.load_profiles(ctx).await;

        let mut name = ctx
            .env_var(AWS_PROFILE)
            .unwrap_or_else(|| self.profile.clone());

        // Walk the source_profile chain down to static keys, recording a
        // role hop per profile passed.
        let mut visited = HashSet::new();
        let mut hops = Vec::new();
        let base = loop {
            if !visited.insert(name.clone()) {
                warn!("circular source_profile chain detected at profile {name}");
                return Ok(None);
            }

            let Some(props) = profiles.get(&name) else {
                debug!("profile {name} not found");
                return Ok(None);
            };

            match (props.get("role_arn"), props.get("source_profile")) {
                (Some(role_arn), Some(source)) => {
                    hops.push(RoleHop {
                        role_arn: role_arn.clone(),
                        session_name: props.get("role_session_name").cloned(),
                        external_id: props.get("external_id").cloned(),
                        region: props.get("region").cloned(),
                    });
                    name = source.clone();
                }
                _ => match static_credential(props) {
                    Some(cred) => break cred,
                    None => {
                        debug!("profile {name} holds no static credentials");
                        return Ok(None);
                    }
                },
            }
        };

        // Assume each role from the innermost source outwards.
        let mut cred = base;
        for hop in hops.iter().rev() {
            match self.assume_role_hop(ctx, hop, cred).await {
                Ok(Some(next)) => cred = next,
                Ok(None) => {
                    debug!("assume role for {} yielded no credentials", hop.role_arn);
                    return Ok(None);
                }
                Err(err) => {
                    warn!("assume role for {} failed: {err:?}", hop.role_arn);
                    return Ok(None);
                }
            }
        }

        Ok(Some(cred))
    }
}

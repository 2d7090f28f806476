use anyhow::{bail, Context, Result};
use std::path::Path;

use skincare_rag_core::models::{SkinConcern, SkinType, UserProfile};

use crate::config::Config;
use crate::pipeline::Pipeline;

/// Profile fields given on the command line.
#[derive(Debug, Default, Clone)]
pub struct ProfileArgs {
    pub skin_type: Option<SkinType>,
    pub concerns: Vec<SkinConcern>,
    pub allergies: Option<String>,
    pub natural: bool,
}

/// Merge a JSON profile file (if any) with command-line flags. Flags win
/// over the file; concerns from both are combined.
pub fn build_profile(file: Option<&Path>, args: ProfileArgs) -> Result<UserProfile> {
    let mut profile = match file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read profile: {}", path.display()))?;
            serde_json::from_str::<UserProfile>(&raw)
                .with_context(|| format!("Invalid profile JSON: {}", path.display()))?
        }
        None => {
            let Some(skin_type) = args.skin_type else {
                bail!("--skin-type is required unless --profile is given");
            };
            UserProfile::new(skin_type, [])
        }
    };

    if let Some(skin_type) = args.skin_type {
        profile.skin_type = skin_type;
    }
    profile.concerns.extend(args.concerns);
    if args.allergies.is_some() {
        profile.allergies = args.allergies;
    }
    profile.prefers_natural |= args.natural;
    Ok(profile)
}

/// One-shot recommendation printed as JSON on stdout.
pub async fn run_recommend(config: &Config, profile: UserProfile) -> Result<()> {
    let pipeline = Pipeline::from_config(config).await?;
    if let Err(e) = pipeline.rebuild_index(false).await {
        tracing::error!(error = %e, "index unavailable");
    }

    let recommendation = pipeline.generate(&profile).await;
    println!("{}", serde_json::to_string_pretty(&recommendation)?);
    Ok(())
}

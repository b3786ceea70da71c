//! Install-time policy gate (spec §6.3 `suggest-install`): can a caller
//! install this skill right now, and why.

use crate::catalog::CatalogStore;
use crate::errors::{CoreError, Result};
use crate::quarantine::{QuarantineFilter, QuarantineStore};
use crate::types::{QuarantineStatus, ScanStatus, ScanSummary, SuggestInstallResponse, TrustTier};

/// `caller_trust`, when given, is the minimum tier the caller is willing to
/// accept; a skill below it is refused even when it is not quarantined.
pub async fn suggest_install(
    catalog: &CatalogStore,
    quarantine: &QuarantineStore,
    skill_id: &str,
    caller_trust: Option<TrustTier>,
) -> Result<SuggestInstallResponse> {
    let skill = catalog.get_skill(skill_id).await?.ok_or(CoreError::NotFound)?;

    let scan_summary = ScanSummary {
        scan_status: skill.scan_status,
        risk_score: skill.risk_score,
        last_scan_at: skill.last_scan_at,
    };

    if skill.scan_status == ScanStatus::Quarantined {
        let entries = quarantine
            .list(&QuarantineFilter { status: Some(QuarantineStatus::Pending), skill_id: Some(skill_id.to_string()) })
            .await?;
        let entry_id = entries.into_iter().next().map(|e| e.id).unwrap_or_default();
        return Err(CoreError::Quarantined { entry_id });
    }

    if let Some(min_tier) = caller_trust {
        if skill.trust_tier < min_tier {
            return Err(CoreError::InsufficientTrust);
        }
    }

    let reason = match skill.scan_status {
        ScanStatus::Safe => format!("last scan was safe, trust tier {}", skill.trust_tier),
        ScanStatus::Review => format!("last scan flagged for review, trust tier {}", skill.trust_tier),
        ScanStatus::Quarantined => unreachable!("handled above"),
    };

    Ok(SuggestInstallResponse { allowed: true, reason, tier: skill.trust_tier, scan_summary })
}

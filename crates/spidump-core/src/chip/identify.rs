//! JEDEC ID based chip identification

use super::{ChipDatabase, ChipProfile, JedecId};
use crate::error::{Result, UnknownChipError};
use crate::programmer::SpiMaster;
use crate::protocol;
use crate::retry::{self, RetryContext, RetryPolicy};

/// Wake the chip and read its JEDEC ID
///
/// Sends Release from Deep Power Down first so a sleeping chip answers,
/// then RDID. Both commands run under `policy`.
pub fn read_id<M: SpiMaster + ?Sized>(master: &mut M, policy: &RetryPolicy) -> Result<JedecId> {
    let context = RetryContext::default();
    retry::run(master, policy, &context, protocol::release_power_down)?;
    let id = retry::run(master, policy, &context, protocol::read_jedec_id)?;
    if id.retries > 0 {
        log::debug!("JEDEC ID read needed {} retries", id.retries);
    }
    Ok(id.value)
}

/// Identify the connected chip
///
/// Returns the matching profile from `db`. An ID with no match fails with
/// `Error::UnknownChip`; no profile is ever guessed.
pub fn identify<M: SpiMaster + ?Sized>(
    master: &mut M,
    db: &ChipDatabase,
    policy: &RetryPolicy,
) -> Result<ChipProfile> {
    let jedec_id = read_id(master, policy)?;
    log::debug!("JEDEC ID: {}", jedec_id);

    match db.find_by_jedec_id(jedec_id) {
        Some(profile) => {
            log::info!(
                "Found {} ({} KiB) JEDEC ID {}",
                profile.display_name(),
                profile.total_size / 1024,
                jedec_id
            );
            Ok(profile.clone())
        }
        None => Err(UnknownChipError { jedec_id }.into()),
    }
}

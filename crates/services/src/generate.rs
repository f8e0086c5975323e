//! Random identifiers: project id suffixes and mock API keys.

use rand::Rng;

use portal_core::Clock;
use portal_core::model::{ApiKey, ProjectId};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

const PROJECT_SUFFIX_LEN: usize = 9;
const API_KEY_PART_LEN: usize = 13;

fn base36<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect()
}

/// `proj_<unix-millis>_<9 base36 chars>`.
#[must_use]
pub fn project_id(clock: &Clock) -> ProjectId {
    let mut rng = rand::rng();
    ProjectId::from_parts(clock.now_millis(), &base36(&mut rng, PROJECT_SUFFIX_LEN))
}

/// `sk_<13 base36 chars>_<13 base36 chars>`.
#[must_use]
pub fn api_key() -> ApiKey {
    let mut rng = rand::rng();
    let first = base36(&mut rng, API_KEY_PART_LEN);
    let second = base36(&mut rng, API_KEY_PART_LEN);
    ApiKey::from_parts(&first, &second)
}

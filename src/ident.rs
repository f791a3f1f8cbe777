//! Opaque identifier generation.
//!
//! Every record gets a random alphanumeric id generated at creation time.
//! Ids double as acceptance-link credentials for invitations, so they are
//! drawn from a CSPRNG rather than a counter.

/// Length of generated identifiers in characters.
///
/// 21 alphanumeric characters carry ~125 bits of entropy, enough for an
/// unguessable acceptance link.
pub const ID_LENGTH: usize = 21;

/// Generates a random alphanumeric identifier of [`ID_LENGTH`] characters.
pub fn generate_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..ID_LENGTH)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

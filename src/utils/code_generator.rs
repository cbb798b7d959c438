use rand::Rng;

/// Five-digit verification code in 10000..=99999.
pub fn generate_verification_code() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(10000..=99999u32).to_string()
}

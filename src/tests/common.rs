use rstest::*;

#[fixture]
pub fn setup_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

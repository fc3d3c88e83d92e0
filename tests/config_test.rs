use fanout::config::{Config, DEFAULT_MAX_PARALLEL, parse_max_parallel};
use fanout::error::Error;

#[test]
fn config_from_env() {
    // Env vars are process-wide; keep every case in one test.
    unsafe {
        std::env::remove_var("FANOUT_MAX_PARALLEL");
        std::env::remove_var("LOG_LEVEL");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.max_parallel, DEFAULT_MAX_PARALLEL);
    assert_eq!(config.log_level, "info");

    unsafe {
        std::env::set_var("FANOUT_MAX_PARALLEL", "12");
    }
    assert_eq!(Config::from_env().unwrap().max_parallel, 12);

    unsafe {
        std::env::set_var("FANOUT_MAX_PARALLEL", "0");
    }
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    unsafe {
        std::env::remove_var("FANOUT_MAX_PARALLEL");
    }
}

#[test]
fn max_parallel_must_be_a_positive_integer() {
    assert_eq!(parse_max_parallel("3").unwrap(), 3);
    assert_eq!(parse_max_parallel(" 8 ").unwrap(), 8);

    for bad in ["0", "-2", "four", ""] {
        assert!(
            matches!(parse_max_parallel(bad), Err(Error::Config(_))),
            "{bad:?} should be rejected"
        );
    }
}

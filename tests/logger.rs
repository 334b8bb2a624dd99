use dwflow::prelude::*;

#[test]
fn logger_is_installed_once() {
    let options = LoggerOptions {
        debug: true,
        ..LoggerOptions::default()
    };
    assert!(init_logger(&options).is_ok());
    assert!(matches!(
        init_logger(&LoggerOptions::default()),
        Err(DwfError::Logger(_))
    ));
    log::debug!("logger installed");
}

#[test]
fn logger_options_from_json() {
    let options: LoggerOptions = serde_json::from_str(r#"{ "ecs": true }"#).unwrap();
    assert!(options.ecs);
    assert!(!options.debug);
    assert!(!options.verbose);
}

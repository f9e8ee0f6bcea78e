use super::types::*;

fn valid_settings() -> Settings {
    Settings {
        cluster_endpoint: ClusterEndpointSettings {
            hostname: "foo.cfg.cache.example.com".into(),
            port: 11211,
        },
        node: NodeSettings::default(),
        poller: PollerSettings::default(),
        socket_pool: SocketPoolSettings::default(),
        protocol: "binary".into(),
        initial_nodes: vec!["a.example:11211".into()],
    }
}

#[test]
fn valid_settings_pass_validation() {
    assert!(valid_settings().validate().is_ok());
}

#[test]
fn empty_hostname_fails() {
    let mut s = valid_settings();
    s.cluster_endpoint.hostname = String::new();
    assert!(s.validate().is_err());
}

#[test]
fn zero_port_fails() {
    let mut s = valid_settings();
    s.cluster_endpoint.port = 0;
    assert!(s.validate().is_err());
}

#[test]
fn hostname_without_cfg_marker_fails() {
    let mut s = valid_settings();
    s.cluster_endpoint.hostname = "foo.cache.example.com".into();
    assert!(s.validate().is_err());
}

#[test]
fn cfg_marker_match_is_case_insensitive() {
    let mut s = valid_settings();
    s.cluster_endpoint.hostname = "FOO.CFG.CACHE.EXAMPLE.COM".into();
    assert!(s.validate().is_ok());
}

#[test]
fn unknown_protocol_fails() {
    let mut s = valid_settings();
    s.protocol = "spdy".into();
    assert!(s.validate().is_err());
}

#[test]
fn negative_poller_interval_means_default() {
    let mut s = valid_settings();
    s.poller.interval_ms = -1;
    assert_eq!(s.poller_interval(), None);
}

#[test]
fn non_negative_poller_interval_is_used_verbatim() {
    let mut s = valid_settings();
    s.poller.interval_ms = 5_000;
    assert_eq!(s.poller_interval(), Some(5_000));
}

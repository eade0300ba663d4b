use std::net::Ipv4Addr;

use crate::net::{Packet, Proto, TtlFocus};
use crate::opt::{CATALOG, HdrOptError, HdrOptions, InjectorConfig, OptionId};

fn seg() -> Packet {
    Packet::tcp_v4(
        Ipv4Addr::new(10, 1, 1, 1),
        Ipv4Addr::new(10, 2, 2, 2),
        5555,
        443,
        77,
        &[0xab; 32],
    )
}

fn seg_with(proto: Proto, opts: &[u8]) -> Packet {
    let mut pkt = seg();
    pkt.set_options(proto, opts).expect("aligned options");
    pkt
}

fn cfg(seed: u64) -> InjectorConfig {
    InjectorConfig {
        seed: Some(seed),
        demote_percent: 0,
        ..InjectorConfig::default()
    }
}

/// Turns on the TCP options that are off by default.
fn cfg_tcp_corrupting(seed: u64) -> InjectorConfig {
    InjectorConfig {
        enabled: vec!["tcp_md5sig".into(), "tcp_paws_corrupt".into()],
        ..cfg(seed)
    }
}

fn cfg_disabling(seed: u64, disabled: &[&str]) -> InjectorConfig {
    InjectorConfig {
        disabled: disabled.iter().map(|k| k.to_string()).collect(),
        ..cfg(seed)
    }
}

#[test]
fn injector_clean_noop_is_padded_to_four_bytes() {
    let mut pkt = seg();
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(1)).expect("parse");
    assert!(hdr.inject_opt(false, false, OptionId::IP_NOOP));
    assert!(!hdr.session().corrupt_done());

    assert_eq!(pkt.ip_options(), &[1, 0, 0, 0]);
    assert_eq!(pkt.ip_hdr_len(), 24);
    assert_eq!(pkt.payload(), &[0xab; 32]);
    assert!(pkt.ip_checksum_ok());
    assert!(pkt.tcp_checksum_ok());
}

#[test]
fn injector_corrupt_session_id_places_it_twice() {
    let mut pkt = seg();
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(2)).expect("parse");
    assert!(hdr.inject_opt(true, false, OptionId::IP_SID));
    assert!(hdr.session().corrupt_done());
    assert_eq!(hdr.session().occurrences(OptionId::IP_SID).len(), 2);

    let opts = pkt.ip_options();
    assert_eq!(opts.len(), 8);
    assert_eq!(&opts[..2], &[136, 4]);
    assert_eq!(&opts[4..6], &[136, 4]);
    assert_eq!(pkt.ip_hdr_len(), 28);
}

#[test]
fn injector_corrupt_request_with_benign_option_leaves_packet_alone() {
    let mut pkt = seg();
    let before = pkt.clone();
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(3)).expect("parse");
    assert!(!hdr.inject_opt(true, false, OptionId::IP_NOOP));
    assert!(!hdr.session().goal_achieved());
    assert_eq!(pkt, before);
}

#[test]
fn injector_tcp_md5_fills_header() {
    let mut pkt = seg();
    let mut hdr =
        HdrOptions::new(Proto::Tcp, &mut pkt, TtlFocus::unknown(), &cfg_tcp_corrupting(4))
            .expect("parse");
    assert!(hdr.inject_opt(true, false, OptionId::TCP_MD5SIG));

    assert_eq!(pkt.tcp_hdr_len(), 40);
    assert_eq!(&pkt.tcp_options()[..2], &[19, 18]);
    assert_eq!(&pkt.tcp_options()[18..], &[0, 0]);
    assert_eq!(pkt.payload(), &[0xab; 32]);
    assert!(pkt.tcp_checksum_ok());
}

#[test]
fn injector_tcp_paws_uses_session_clock() {
    let mut pkt = seg();
    let mut hdr =
        HdrOptions::new(Proto::Tcp, &mut pkt, TtlFocus::unknown(), &cfg_tcp_corrupting(5))
            .expect("parse");
    hdr.session_mut().set_clock(10_000);
    assert!(hdr.inject_opt(true, false, OptionId::TCP_PAWS_CORRUPT));

    assert_eq!(pkt.tcp_hdr_len(), 32);
    assert_eq!(&pkt.tcp_options()[..6], &[8, 10, 0, 0, 0x24, 0xb8]);
}

#[test]
fn injector_rejects_ids_of_the_other_header() {
    let mut pkt = seg();
    let before = pkt.clone();
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(6)).expect("parse");

    assert!(!hdr.inject_opt(false, false, OptionId::TCP_NOP));
    assert!(!hdr.inject_opt(false, false, OptionId(CATALOG.len())));
    assert!(!hdr.remove_option(OptionId::TCP_MD5SIG));
    assert_eq!(pkt, before);
}

#[test]
fn injector_prepare_fails_without_room_under_mtu() {
    let mut pkt = seg();
    let config = InjectorConfig {
        mtu: pkt.len() + 3,
        ..cfg(7)
    };
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &config).expect("parse");

    assert!(!hdr.prepare_injection(false, false));
    assert_eq!(hdr.session().target_len(), 0);
    assert!(!hdr.inject_opt(false, false, OptionId::IP_NOOP));
    assert_eq!(pkt.ip_hdr_len(), 20);
}

#[test]
fn injector_target_is_limited_by_mtu() {
    let mut pkt = seg();
    let config = InjectorConfig {
        mtu: pkt.len() + 9,
        ..cfg(8)
    };
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &config).expect("parse");

    assert!(hdr.prepare_injection(true, false));
    assert_eq!(hdr.session().target_len(), 8);
    // CIPSO needs ten bytes.
    assert!(!hdr.inject_option(OptionId::IP_CIPSO));
    assert!(pkt.ip_options().is_empty());
}

#[test]
fn injector_strip_replaces_existing_options() {
    let mut pkt = seg_with(Proto::Ip, &[148, 4, 0, 0]);
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(9)).expect("parse");
    assert_eq!(hdr.session().occurrences(OptionId::IP_RA).len(), 1);

    assert!(hdr.inject_opt(false, true, OptionId::IP_NOOP));
    assert!(hdr.session().occurrences(OptionId::IP_RA).is_empty());
    assert_eq!(pkt.ip_options(), &[1, 0, 0, 0]);
}

#[test]
fn injector_appends_after_existing_options() {
    let mut pkt = seg_with(Proto::Ip, &[148, 4, 0, 0]);
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(10)).expect("parse");
    assert!(hdr.inject_opt(false, false, OptionId::IP_SID));

    let opts = pkt.ip_options();
    assert_eq!(opts.len(), 8);
    assert_eq!(&opts[..4], &[148, 4, 0, 0]);
    assert_eq!(&opts[4..6], &[136, 4]);
}

#[test]
fn injector_existing_nops_do_not_block_another() {
    let mut pkt = seg_with(Proto::Tcp, &[1, 1, 1, 1]);
    let before = pkt.clone();
    let mut hdr =
        HdrOptions::new(Proto::Tcp, &mut pkt, TtlFocus::unknown(), &cfg(11)).expect("parse");

    // NOP occurrences are not indexed, so another one is still allowed.
    assert!(hdr.inject_opt(false, false, OptionId::TCP_NOP));
    assert_eq!(pkt.tcp_hdr_len(), 28);
    assert_ne!(pkt, before);
}

#[test]
fn injector_rejects_malformed_existing_options() {
    let mut pkt = seg_with(Proto::Ip, &[68, 0, 0, 0]);
    let before = pkt.clone();
    let err = HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(12))
        .err()
        .expect("malformed");
    assert!(matches!(
        err,
        HdrOptError::MalformedOptions {
            proto: Proto::Ip,
            code: 68,
            ..
        }
    ));
    assert_eq!(pkt, before);
}

#[test]
fn injector_random_corrupt_sweep_always_reaches_goal() {
    for seed in 0..40 {
        for proto in [Proto::Ip, Proto::Tcp] {
            let mut pkt = seg();
            let config = cfg_tcp_corrupting(seed);
            let mut hdr =
                HdrOptions::new(proto, &mut pkt, TtlFocus::unknown(), &config).expect("parse");
            assert!(hdr.inject_random_opts(true, false), "seed {seed} {proto:?}");
            assert!(hdr.session().corrupt_done());

            let opts = match proto {
                Proto::Ip => pkt.ip_options(),
                Proto::Tcp => pkt.tcp_options(),
            };
            assert!(!opts.is_empty());
            assert!(opts.len() <= 40);
            assert_eq!(opts.len() % 4, 0);
            assert!(pkt.ip_checksum_ok());
            assert!(pkt.tcp_checksum_ok());
            assert_eq!(pkt.payload(), &[0xab; 32]);
        }
    }
}

#[test]
fn injector_tcp_corrupting_options_are_off_by_default() {
    let mut pkt = seg();
    let before = pkt.clone();
    let mut hdr =
        HdrOptions::new(Proto::Tcp, &mut pkt, TtlFocus::unknown(), &cfg(18)).expect("parse");

    assert!(!hdr.inject_opt(true, false, OptionId::TCP_MD5SIG));
    assert!(!hdr.inject_opt(true, false, OptionId::TCP_PAWS_CORRUPT));
    // Nothing on the TCP side can corrupt without them.
    assert!(!hdr.inject_random_opts(true, false));
    assert_eq!(pkt, before);
}

#[test]
fn injector_clean_targeted_one_shot_is_not_placed() {
    let mut pkt = seg_with(Proto::Ip, &[148, 4, 0, 0]);
    let before = pkt.clone();
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(19)).expect("parse");

    // Nothing corrupting was asked for or placed, so the goal still holds.
    assert!(hdr.inject_opt(false, false, OptionId::IP_LSRR));
    assert!(hdr.session().occurrences(OptionId::IP_LSRR).is_empty());
    assert!(!hdr.session().corrupt_done());
    assert_eq!(pkt, before);
}

#[test]
fn injector_clean_does_not_repeat_an_option() {
    let mut pkt = seg_with(Proto::Ip, &[148, 4, 0, 0]);
    let before = pkt.clone();
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(20)).expect("parse");

    assert!(hdr.inject_opt(false, false, OptionId::IP_RA));
    assert_eq!(hdr.session().occurrences(OptionId::IP_RA).len(), 1);
    assert_eq!(pkt, before);
}

#[test]
fn injector_random_clean_sweep_default_config_reaches_goal() {
    let one_shot = [
        OptionId::IP_TIMESTAMP,
        OptionId::IP_LSRR,
        OptionId::IP_RR,
        OptionId::IP_CIPSO,
        OptionId::IP_SEC,
    ];
    for seed in 0..20 {
        let mut pkt = seg();
        let mut hdr = HdrOptions::new(
            Proto::Ip,
            &mut pkt,
            TtlFocus::known(8),
            &InjectorConfig {
                seed: Some(seed),
                ..InjectorConfig::default()
            },
        )
        .expect("parse");
        assert!(hdr.inject_random_opts(false, false), "seed {seed}");
        let s = hdr.session();
        assert!(!s.corrupt_done());
        for id in [OptionId::IP_NOOP, OptionId::IP_RA, OptionId::IP_SID] {
            assert_eq!(s.occurrences(id).len(), 1, "seed {seed} {id}");
        }
        for id in one_shot {
            assert!(s.occurrences(id).is_empty(), "seed {seed} {id}");
        }

        // 1 + 4 + 4 bytes, padded to 12.
        assert_eq!(pkt.ip_hdr_len(), 32, "seed {seed}");
        assert!(pkt.ip_checksum_ok());

        let mut pkt = seg();
        let mut hdr = HdrOptions::new(
            Proto::Tcp,
            &mut pkt,
            TtlFocus::unknown(),
            &InjectorConfig {
                seed: Some(seed),
                ..InjectorConfig::default()
            },
        )
        .expect("parse");
        assert!(hdr.inject_random_opts(false, false), "seed {seed}");
        assert!(!hdr.session().corrupt_done());
        assert_eq!(pkt.tcp_options(), &[1, 0, 0, 0]);
        assert!(pkt.tcp_checksum_ok());
    }
}

#[test]
fn injector_random_sweep_with_everything_disabled_rewrites_same_bytes() {
    let keys: Vec<&str> = CATALOG.iter().map(|d| d.key).collect();
    let mut pkt = seg_with(Proto::Ip, &[148, 4, 0, 0, 136, 4, 9, 9]);
    let before = pkt.clone();
    let mut hdr = HdrOptions::new(
        Proto::Ip,
        &mut pkt,
        TtlFocus::unknown(),
        &cfg_disabling(13, &keys),
    )
    .expect("parse");

    assert!(hdr.inject_random_opts(false, false));
    assert_eq!(pkt, before);
}

#[test]
fn injector_remove_single_occurrence() {
    let mut pkt = seg_with(Proto::Ip, &[148, 4, 0, 0, 136, 4, 1, 2]);
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(14)).expect("parse");

    assert!(hdr.remove_option(OptionId::IP_RA));
    assert_eq!(
        hdr.session().occurrences(OptionId::IP_SID)[0].offset,
        0,
        "later options shift down"
    );
    assert_eq!(pkt.ip_options(), &[136, 4, 1, 2]);
    assert_eq!(pkt.ip_hdr_len(), 24);
    assert!(pkt.ip_checksum_ok());
}

#[test]
fn injector_remove_every_occurrence() {
    let opts = [136, 4, 1, 2, 1, 136, 4, 3, 4, 0, 0, 0];
    let mut pkt = seg_with(Proto::Ip, &opts);
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(15)).expect("parse");

    assert!(hdr.remove_option(OptionId::IP_SID));
    assert!(hdr.session().occurrences(OptionId::IP_SID).is_empty());
    assert_eq!(pkt.ip_options(), &[1, 0, 0, 0]);
}

#[test]
fn injector_remove_absent_option_is_a_no_op() {
    let mut pkt = seg_with(Proto::Ip, &[148, 4, 0, 0]);
    let before = pkt.clone();
    let mut hdr =
        HdrOptions::new(Proto::Ip, &mut pkt, TtlFocus::unknown(), &cfg(16)).expect("parse");

    assert!(!hdr.remove_option(OptionId::IP_SID));
    assert_eq!(pkt, before);
}

#[test]
fn injector_remove_then_inject_again() {
    let mut opts = vec![19, 18];
    opts.extend_from_slice(&[0; 16]);
    opts.extend_from_slice(&[1, 1]);
    let mut pkt = seg_with(Proto::Tcp, &opts);
    let mut hdr =
        HdrOptions::new(Proto::Tcp, &mut pkt, TtlFocus::unknown(), &cfg_tcp_corrupting(17))
            .expect("parse");

    assert!(hdr.remove_option(OptionId::TCP_MD5SIG));
    assert_eq!(hdr.session().actual_len(), 4);
    assert!(hdr.inject_opt(true, false, OptionId::TCP_MD5SIG));
    assert_eq!(pkt.tcp_hdr_len(), 44);
    assert_eq!(&pkt.tcp_options()[..2], &[1, 1]);
    assert_eq!(&pkt.tcp_options()[4..6], &[19, 18]);
}

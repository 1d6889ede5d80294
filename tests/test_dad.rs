mod common;

use std::time::Duration;

use common::*;
use ndisc::config::NdConfig;
use ndisc::models::NdBody;
use ndisc::utilities::{link_local_from_lladdr, multicast_lladdr, solicited_node, ALL_NODES};
use ndisc::{AddressOptions, ResolveError};

fn immediate() -> AddressOptions {
    AddressOptions {
        dad_delay: Some(Duration::ZERO),
        ..Default::default()
    }
}

fn config(dad_count: u32) -> NdConfig {
    NdConfig {
        dad_count,
        ..Default::default()
    }
}

#[test]
fn test_dad_completes() {
    let (ctx, ifp, recorder) = context(config(1));
    let target = addr("fe80::dead");
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    assert!(ia.is_tentative());

    let probes = recorder.solicitations();
    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].lladdr, multicast_lladdr(solicited_node(target)));
    let message = probes[0].message().unwrap();
    assert!(message.is_dad());
    assert_eq!(message.dst_addr, solicited_node(target));
    assert_eq!(message.target, target);
    assert_eq!(message.options.source_lladdr(6), Ok(None));
    assert!(message.options.nonce().unwrap().is_some());

    // A tentative address is not used as a source.
    assert_eq!(ifp.select_source(addr("fe80::1"), None), None);

    ctx.advance(Duration::from_secs(1));
    assert!(ia.is_usable());
    assert_eq!(recorder.events(), vec![Event::Activated(target)]);
    assert!(ctx.dad_progress(&ifp, target).is_none());
    assert_eq!(recorder.solicitations().len(), 1);
}

#[test]
fn test_dad_initial_delay() {
    let (ctx, ifp, recorder) = context(config(1));
    let target = addr("fe80::dead");
    let options = AddressOptions {
        dad_delay: Some(Duration::from_millis(500)),
        ..Default::default()
    };
    let ia = ctx.add_address(&ifp, target, 64, options).unwrap();
    assert!(recorder.solicitations().is_empty());

    ctx.advance(Duration::from_millis(500));
    assert_eq!(recorder.solicitations().len(), 1);
    assert!(ia.is_tentative());

    ctx.advance(Duration::from_secs(1));
    assert!(ia.is_usable());
}

#[test]
fn test_dad_probe_from_another_node() {
    let (ctx, ifp, recorder) = context(config(3));
    let target = addr("fe80::dead");
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    ctx.advance(Duration::from_secs(1));
    assert_eq!(ctx.dad_progress(&ifp, target).unwrap().ns_sent, 2);

    ctx.input(&ifp, &dad_probe(target, Some([9; 6])));

    assert!(ia.is_duplicated());
    assert!(!ia.is_tentative());
    assert!(!ia.is_usable());
    assert!(ctx.dad_progress(&ifp, target).is_none());
    assert_eq!(recorder.events(), vec![Event::Duplicated(target)]);
    assert_eq!(ctx.statistics().lock().unwrap().dad_duplicates, 1);

    // The probe timer was cancelled.
    ctx.advance(Duration::from_secs(5));
    assert_eq!(recorder.solicitations().len(), 2);
    assert!(!ifp.is_disabled());
}

#[test]
fn test_dad_looped_back_probe() {
    let (ctx, ifp, recorder) = context(config(3));
    let target = addr("fe80::dead");
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    ctx.advance(Duration::from_secs(1));

    // Our own probe, reflected by the link.
    let probes = recorder.solicitations();
    assert_eq!(probes.len(), 2);
    ctx.input(&ifp, &probes[1].packet);

    assert!(ia.is_tentative());
    assert!(!ia.is_duplicated());
    let progress = ctx.dad_progress(&ifp, target).unwrap();
    assert_eq!(progress.looped_back, 1);
    assert_eq!(progress.ns_received, 0);
    assert_eq!(ctx.statistics().lock().unwrap().dad_loopbacks, 1);

    ctx.advance(Duration::from_secs(1));
    assert_eq!(recorder.solicitations().len(), 3);
    ctx.advance(Duration::from_secs(1));
    assert!(ia.is_usable());
    assert_eq!(recorder.events(), vec![Event::Activated(target)]);
}

#[test]
fn test_dad_probe_without_nonce_is_duplicate() {
    let (ctx, ifp, _recorder) = context(config(1));
    let target = addr("fe80::dead");
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    ctx.input(&ifp, &dad_probe(target, None));
    assert!(ia.is_duplicated());
}

#[test]
fn test_dad_advert_for_tentative_address() {
    let (ctx, ifp, recorder) = context(config(1));
    let target = addr("fe80::dead");
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();

    ctx.input(
        &ifp,
        &na(
            addr("fe80::1"),
            ALL_NODES,
            target,
            flags(false, false, true),
            Some(mac(0xbb)),
        ),
    );

    assert!(ia.is_duplicated());
    assert_eq!(recorder.events(), vec![Event::Duplicated(target)]);
    // No cache entry is created for our own address.
    assert!(ctx.neighbors(&ifp).is_empty());
}

#[test]
fn test_dad_ignores_own_advert() {
    let (ctx, ifp, _recorder) = context(config(1));
    let target = addr("fe80::dead");
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();

    ctx.input(
        &ifp,
        &na(
            target,
            ALL_NODES,
            target,
            flags(false, false, true),
            Some(local_mac()),
        ),
    );

    assert!(ia.is_tentative());
    assert!(!ia.is_duplicated());
}

#[test]
fn test_dad_without_enhanced_mode() {
    let config = NdConfig {
        dad_enhanced: false,
        ..config(1)
    };
    let (ctx, ifp, recorder) = context(config);
    let target = addr("fe80::dead");
    ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    let probes = recorder.solicitations();
    assert_eq!(probes[0].message().unwrap().options.nonce(), Ok(None));
}

#[test]
fn test_dad_disabled() {
    let (ctx, ifp, recorder) = context(config(0));
    let target = addr("fe80::dead");
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    assert!(ia.is_usable());
    assert!(recorder.solicitations().is_empty());
    assert_eq!(recorder.events(), vec![Event::Activated(target)]);

    // Anycast and explicitly excluded addresses skip DAD too.
    let (ctx, ifp, recorder) = context(config(1));
    let anycast = AddressOptions {
        anycast: true,
        ..immediate()
    };
    let nodad = AddressOptions {
        nodad: true,
        ..immediate()
    };
    assert!(ctx
        .add_address(&ifp, addr("2001:db8::"), 64, anycast)
        .unwrap()
        .is_usable());
    assert!(ctx
        .add_address(&ifp, addr("2001:db8::1"), 64, nodad)
        .unwrap()
        .is_usable());
    assert!(recorder.solicitations().is_empty());
}

#[test]
fn test_dad_stop_is_idempotent() {
    let (ctx, ifp, recorder) = context(config(3));
    let target = addr("fe80::dead");
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    let timers = ctx.pending_timers();

    ctx.dad_stop(&ifp, target);
    assert_eq!(ctx.pending_timers(), timers - 1);
    ctx.dad_stop(&ifp, target);
    ctx.dad_stop(&ifp, addr("fe80::beef"));
    assert!(ctx.dad_progress(&ifp, target).is_none());

    ctx.advance(Duration::from_secs(5));
    assert_eq!(recorder.solicitations().len(), 1);
    assert!(ia.is_tentative());
    assert!(recorder.events().is_empty());
}

#[test]
fn test_dad_start_twice() {
    let (ctx, ifp, recorder) = context(config(2));
    let target = addr("fe80::dead");
    ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    ctx.dad_start(&ifp, target, Duration::ZERO);
    assert_eq!(recorder.solicitations().len(), 1);
    assert_eq!(ctx.dad_progress(&ifp, target).unwrap().ns_sent, 1);
}

#[test]
fn test_dad_probe_count_above_retry_ceiling() {
    for (dad_count, dad_max_tries) in [(15, 15), (5, 3)] {
        let config = NdConfig {
            dad_max_tries,
            ..config(dad_count)
        };
        let (ctx, ifp, recorder) = context(config);
        let target = addr("fe80::dead");
        let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();

        ctx.advance(Duration::from_secs(60));
        assert_eq!(recorder.solicitations().len(), dad_count as usize);
        assert!(ia.is_usable());
        assert_eq!(recorder.events(), vec![Event::Activated(target)]);
        assert!(ctx.dad_progress(&ifp, target).is_none());
    }
}

#[test]
fn test_dad_gives_up_when_link_is_not_running() {
    let config = NdConfig {
        dad_max_tries: 3,
        ..config(1)
    };
    let (ctx, ifp, recorder) = context(config);
    let target = addr("fe80::dead");
    let options = AddressOptions {
        dad_delay: Some(Duration::from_secs(1)),
        ..Default::default()
    };
    let ia = ctx.add_address(&ifp, target, 64, options).unwrap();
    ifp.set_running(false);

    ctx.advance(Duration::from_millis(3500));
    let progress = ctx.dad_progress(&ifp, target).unwrap();
    assert_eq!(progress.ns_tried, 3);
    assert_eq!(progress.ns_sent, 0);

    ctx.advance(Duration::from_secs(1));
    assert!(ctx.dad_progress(&ifp, target).is_none());
    assert!(ia.is_tentative());
    assert!(recorder.solicitations().is_empty());
}

#[test]
fn test_hardware_address_collision_disables_interface() {
    let (ctx, ifp, recorder) = context(config(1));
    let target = link_local_from_lladdr(&local_mac()).unwrap();
    assert_eq!(target, addr("fe80::ff:fe00:a"));
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();

    ctx.input(
        &ifp,
        &na(
            addr("fe80::1"),
            ALL_NODES,
            target,
            flags(false, false, true),
            Some(local_mac()),
        ),
    );
    // Our own link-layer address: looped back, not a collision.
    assert!(ia.is_tentative());

    ctx.input(&ifp, &dad_probe(target, None));
    assert!(ia.is_duplicated());
    assert!(ifp.is_disabled());
    assert_eq!(
        recorder.events(),
        vec![Event::Duplicated(target), Event::Disabled(ifp.index())]
    );

    // Disabled interfaces neither resolve nor process input.
    assert_eq!(
        ctx.resolve(&ifp, addr("fe80::1"), ipv6_packet(target, addr("fe80::1"))),
        Err(ResolveError::NetDown)
    );
    let received = ctx.statistics().lock().unwrap().ns_received;
    ctx.input(&ifp, &dad_probe(target, None));
    assert_eq!(ctx.statistics().lock().unwrap().ns_received, received);
}

#[test]
fn test_auto_linklocal() {
    let recorder = std::sync::Arc::new(Recorder::default());
    let hooks = ndisc::hooks::Hooks::new(recorder.clone()).with_address_events(recorder.clone());
    let config = config(1);
    let ctx = ndisc::NdContext::with_seed(config.clone(), hooks, 7);
    let ifp = ctx
        .attach(ndisc::interface::Interface::new(
            2,
            "eth1",
            ndisc::models::LinkType::Ethernet,
            Some(local_mac()),
            config.interface_settings(),
        ))
        .unwrap();

    let addresses = ifp.addresses();
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].addr(), addr("fe80::ff:fe00:a"));
    assert!(addresses[0].is_tentative());

    // At most the maximum initial delay, then one retransmission interval.
    ctx.advance(Duration::from_secs(2));
    assert!(addresses[0].is_usable());
    assert_eq!(recorder.events(), vec![Event::Activated(addresses[0].addr())]);
}

#[test]
fn test_defend_address_against_probe() {
    let (ctx, ifp, recorder) = setup(NdConfig::default());
    ctx.input(&ifp, &dad_probe(addr("fe80::a"), Some([9; 6])));

    let advertisements = recorder.advertisements();
    assert_eq!(advertisements.len(), 1);
    assert_eq!(advertisements[0].lladdr, multicast_lladdr(ALL_NODES));
    let message = advertisements[0].message().unwrap();
    assert_eq!(message.src_addr, addr("fe80::a"));
    assert_eq!(message.dst_addr, ALL_NODES);
    assert_eq!(message.target, addr("fe80::a"));
    assert_eq!(message.body, NdBody::Advert(flags(false, false, true)));
    assert_eq!(message.options.target_lladdr(6), Ok(Some(local_mac())));
    // The prober is not added to the cache.
    assert!(ctx.neighbors(&ifp).is_empty());
}

#[test]
fn test_link_down_and_up() {
    let (ctx, ifp, recorder) = context(config(1));
    let target = addr("fe80::dead");
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    ctx.advance(Duration::from_secs(1));
    assert!(ia.is_usable());

    ctx.link_down(&ifp);
    assert!(ia.flags().detached);
    assert!(!ia.is_usable());
    assert!(!ia.is_tentative());

    // Addresses added while the link is down wait for it.
    let other = ctx
        .add_address(&ifp, addr("fe80::beef"), 64, immediate())
        .unwrap();
    assert!(other.flags().detached);
    assert!(ctx.dad_progress(&ifp, addr("fe80::beef")).is_none());

    recorder.clear();
    ctx.link_up(&ifp);
    assert!(ia.is_tentative());
    assert!(other.is_tentative());
    assert!(ctx.dad_progress(&ifp, target).is_some());

    ctx.advance(Duration::from_secs(3));
    assert!(ia.is_usable());
    assert!(other.is_usable());
    assert_eq!(recorder.solicitations().len(), 2);
}

#[test]
fn test_link_down_stops_dad() {
    let (ctx, ifp, recorder) = context(config(3));
    let target = addr("fe80::dead");
    let ia = ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    ctx.link_down(&ifp);
    assert!(ctx.dad_progress(&ifp, target).is_none());
    ctx.advance(Duration::from_secs(5));
    assert_eq!(recorder.solicitations().len(), 1);
    assert!(!ia.is_usable());
}

#[test]
fn test_removing_address_stops_dad() {
    let (ctx, ifp, recorder) = context(config(3));
    let target = addr("fe80::dead");
    ctx.add_address(&ifp, target, 64, immediate()).unwrap();
    assert!(ctx.remove_address(&ifp, target).is_some());
    assert!(ctx.remove_address(&ifp, target).is_none());
    assert!(ctx.dad_progress(&ifp, target).is_none());
    ctx.advance(Duration::from_secs(5));
    assert_eq!(recorder.solicitations().len(), 1);
}

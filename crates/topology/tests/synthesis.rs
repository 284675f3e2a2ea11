/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

use inventory::{OrganizerError, SiteRecords};
use serde_json::json;
use topology::{
    ComponentType, GraphBuilder, LinkMode, LinkType, StaticOverrides, SubstrateGraph,
    SynthesisContext, SynthesisError, SynthesisOptions, TopologySynthesizer,
};

fn worker() -> serde_json::Value {
    json!({
        "name": "lbnl-w1",
        "serial": "5B3BR53",
        "model": {"model": "R7525", "ram": "512G", "cpu": 2, "core": 64, "disk": "1.5 TB"},
        "ports": [
            {"role": "PhysicalFunction", "mac": "0C:42:A1:00:00:0A", "bdf": "0000:41:00.0",
             "slot": "1", "peer_port": "et1", "speed": "25 Gbps", "model": "ConnectX-5"},
            {"role": "PhysicalFunction", "mac": "0C:42:A1:00:00:0B", "bdf": "0000:41:00.1",
             "slot": "1", "peer_port": "et2", "speed": "25 Gbps", "model": "ConnectX-5"}
        ],
        "interfaces": [{"name": "eth0", "ipv4": "10.0.0.1", "netmask": "255.255.255.0"}]
    })
}

fn site() -> serde_json::Value {
    json!({
        "site": "LBNL",
        "workers": [worker()],
        "dp_switch": {"name": "lbnl-data-sw", "mgmt_ip": "192.168.1.10"},
        "routers": [{
            "name": "lbnl-r1",
            "interfaces": [{"name": "GigE0/0/0", "ipv4": "10.0.0.2", "netmask": "24", "speed": "100G"}]
        }],
        "endpoints": [{
            "device": "agg3.ashb",
            "interface": "HundredGigE0/0/0/1",
            "provider": "AZURE",
            "in_use": [10, 11, 12],
            "capacity_mbps": 100000
        }]
    })
}

fn records(value: serde_json::Value) -> SiteRecords {
    serde_json::from_value(value).unwrap()
}

fn synthesize(records: &SiteRecords) -> Result<(SubstrateGraph, SynthesisContext), SynthesisError> {
    let options = SynthesisOptions::default();
    let mut ctx = SynthesisContext::new();
    let graph = TopologySynthesizer::new(records, &options).synthesize(SubstrateGraph::new(), &mut ctx)?;
    Ok((graph, ctx))
}

fn link_count(graph: &SubstrateGraph, link_type: LinkType) -> usize {
    graph
        .links()
        .iter()
        .filter(|link| link.link_type == link_type)
        .count()
}

#[test]
fn test_end_to_end_site() {
    let records = records(site());
    let (graph, ctx) = synthesize(&records).unwrap();

    let cards: Vec<_> = graph
        .components()
        .iter()
        .filter(|c| c.component_type == ComponentType::SmartNIC)
        .collect();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].name, "lbnl-w1-slot1");
    assert_eq!(cards[0].interfaces.len(), 2);
    assert_eq!(cards[0].labels.bdf, ["0000:41:00.0", "0000:41:00.1"]);
    let port = graph.interface(cards[0].interfaces[0]).unwrap();
    assert_eq!(port.labels.vlan_range.as_deref(), Some("1-4095"));
    assert_eq!(port.capacities.bw, Some(25));

    assert_eq!(link_count(&graph, LinkType::Patch), 2);
    let patched = graph.link_of(cards[0].interfaces[1]).unwrap();
    let switch_port = graph.interface(patched.interfaces[0]).unwrap();
    assert_eq!(switch_port.name, "et2");

    let inferred: Vec<_> = graph
        .links()
        .iter()
        .filter(|link| link.link_type == LinkType::L2Path)
        .collect();
    assert_eq!(inferred.len(), 1);
    let ends: Vec<_> = inferred[0]
        .interfaces
        .iter()
        .map(|id| graph.interface(*id).unwrap().name.as_str())
        .collect();
    assert_eq!(ends, ["eth0", "GigE0/0/0"]);

    let exchange = graph.find_node("LBNL-exchange").unwrap();
    let exchange_port = graph.node_interfaces(exchange)[0];
    assert_eq!(
        graph.interface(exchange_port).unwrap().labels.vlan_range.as_deref(),
        Some("1-9,13-4094")
    );

    let server = graph.find_node("lbnl-w1").unwrap();
    let capacities = graph.node_capacities(server).unwrap();
    assert_eq!(capacities.ram, Some(512));
    assert_eq!(capacities.disk, Some(1500));
    assert_eq!(capacities.core, Some(64));

    assert_eq!(ctx.summary.dedicated_cards, 1);
    assert_eq!(ctx.summary.shared_cards, 0);
    assert_eq!(ctx.summary.patch_links, 2);
    assert_eq!(ctx.summary.inferred_links, 1);
    assert_eq!(ctx.summary.exchange_ports, 1);
}

#[test]
fn test_shared_card_lists_virtual_functions() {
    let mut value = site();
    value["workers"][0]["ports"] = json!([
        {"role": "VirtualFunction", "mac": "0C:42:A1:00:00:60", "bdf": "0000:e2:00.0",
         "vbdf": "0000:e2:00.2", "vlan": "2018"},
        {"role": "PhysicalFunction", "mac": "0C:42:A1:00:00:5E", "bdf": "0000:e2:00.0",
         "slot": "7", "peer_port": "HundredGigE0/0/0/21", "model": "ConnectX-6"},
        {"role": "PhysicalFunction", "mac": "0C:42:A1:00:00:5F", "bdf": "0000:e2:00.1",
         "slot": "7", "peer_port": "HundredGigE0/0/0/22", "model": "ConnectX-6"},
        {"role": "VirtualFunction", "mac": "0C:42:A1:00:00:61", "bdf": "0000:e2:00.0",
         "vbdf": "0000:e2:00.3", "vlan": "2019"}
    ]);
    let records = records(value);
    let (graph, ctx) = synthesize(&records).unwrap();

    let nic = graph
        .components()
        .iter()
        .find(|c| c.component_type == ComponentType::SharedNIC)
        .unwrap();
    assert_eq!(nic.name, "lbnl-w1-slot7");
    assert_eq!(nic.capacities.unit, Some(2));
    assert_eq!(nic.labels.bdf, ["0000:e2:00.2", "0000:e2:00.3"]);

    let p1 = graph.interface(nic.interfaces[0]).unwrap();
    assert_eq!(p1.labels.mac, ["0C:42:A1:00:00:60", "0C:42:A1:00:00:61"]);
    assert_eq!(p1.labels.vlan, ["2018", "2019"]);

    let uplink = graph.link_of(nic.interfaces[0]).unwrap();
    assert_eq!(
        graph.interface(uplink.interfaces[0]).unwrap().name,
        "HundredGigE0/0/0/21"
    );
    assert!(graph.link_of(nic.interfaces[1]).is_some());
    assert_eq!(ctx.summary.shared_cards, 1);
}

#[test]
fn test_nvme_drive_described_only_by_text() {
    let mut value = site();
    value["workers"][0]["nvme"] = json!([{
        "serial": "PHLJ0001",
        "description": "Dell Express Flash NVMe P4510 1TB SFF in PCIe SSD Slot 22 in Bay 2 (0000:21:00.0)"
    }]);
    let records = records(value);
    let (graph, _) = synthesize(&records).unwrap();

    let nvme = graph
        .components()
        .iter()
        .find(|c| c.component_type == ComponentType::NVME)
        .unwrap();
    assert_eq!(nvme.name, "lbnl-w1-nvme1");
    assert_eq!(nvme.model.as_deref(), Some("P4510"));
    assert_eq!(nvme.capacities.disk, Some(1000));
    assert_eq!(nvme.labels.bdf, ["0000:21:00.0"]);
}

#[test]
fn test_missing_ram_is_fatal() {
    let mut value = site();
    value["workers"][0]["model"]["ram"] = serde_json::Value::Null;
    let records = records(value);
    match synthesize(&records) {
        Err(SynthesisError::FatalField { node, field }) => {
            assert_eq!(node, "lbnl-w1");
            assert_eq!(field, "ram");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_missing_switch_is_fatal_when_ports_are_cabled() {
    let mut value = site();
    value["dp_switch"] = serde_json::Value::Null;
    let records = records(value);
    assert!(matches!(
        synthesize(&records),
        Err(SynthesisError::FatalField { field: "dp_switch", .. })
    ));
}

#[test]
fn test_optional_resources_are_skipped() {
    let records = records(json!({
        "site": "STAR",
        "routers": [{"name": "star-r1", "interfaces": [{"name": "GigE0/0/1"}]}]
    }));
    let (graph, ctx) = synthesize(&records).unwrap();
    assert_eq!(graph.nodes().len(), 1);
    assert!(graph.links().is_empty());
    assert_eq!(ctx.summary.nodes, 1);
}

#[test]
fn test_orphan_virtual_function_is_fatal() {
    let mut value = site();
    value["workers"][0]["ports"] = json!([
        {"role": "VirtualFunction", "mac": "0C:42:A1:00:00:60", "bdf": "0000:99:00.0",
         "vbdf": "0000:99:00.2", "vlan": "2018"}
    ]);
    let records = records(value);
    match synthesize(&records) {
        Err(SynthesisError::Organizer { node, source }) => {
            assert_eq!(node, "lbnl-w1");
            assert!(matches!(source, OrganizerError::MissingParent { .. }));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_controller_links_replace_subnet_matching() {
    let mut value = site();
    value["routers"] = json!([
        {"name": "r1", "interfaces": [
            {"name": "a", "ipv4": "10.1.0.1", "netmask": "30"},
            {"name": "b", "ipv4": "10.2.0.1", "netmask": "24"}
        ]},
        {"name": "r2", "interfaces": [
            {"name": "c", "ipv4": "10.1.0.2", "netmask": "30"},
            {"name": "d", "ipv4": "10.2.0.9", "netmask": "31"}
        ]}
    ]);
    value["controller_links"] = json!([{"local": "10.2.0.1", "remote": "10.2.0.9"}]);
    let records = records(value);
    let (graph, ctx) = synthesize(&records).unwrap();

    assert_eq!(ctx.summary.inferred_links, 1);
    let link = graph
        .links()
        .iter()
        .find(|link| link.link_type == LinkType::L2Path)
        .unwrap();
    let ends: Vec<_> = link
        .interfaces
        .iter()
        .map(|id| graph.interface(*id).unwrap().name.as_str())
        .collect();
    assert_eq!(ends, ["b", "d"]);
}

#[test]
fn test_authoritative_mode_requires_controller_links() {
    let records = records(site());
    let options = SynthesisOptions {
        link_mode: LinkMode::Authoritative,
        ..Default::default()
    };
    let result = TopologySynthesizer::new(&records, &options)
        .synthesize(SubstrateGraph::new(), &mut SynthesisContext::new());
    assert!(matches!(
        result,
        Err(SynthesisError::FatalField {
            field: "controller_links",
            ..
        })
    ));
}

const OVERRIDES: &str = r#"
LBNL:
  dp_switch:
    name: lbnl-data-sw-alias
  nodes:
    lbnl-w1: { ram: 768 }
    lbnl-w9: { ram: 1 }
  stitch_ports:
    - port: HundredGigE0/0/0/5
      peer: "AL2S agg3.ashb HundredGigE0/0/0/1"
      vlan_range: "2000-2100"
  facility_ports:
    RENCI-DTN:
      stitch_port: HundredGigE0/0/0/5
      vlan_range: "2001"
      mtu: 9000
    Cloud-AZURE:
      stitch_port: HundredGigE0/0/0/1
      ipv4_net: 192.168.10.0/24
"#;

#[test]
fn test_overrides_are_applied_last() {
    let records = records(site());
    let overrides = StaticOverrides::from_yaml_str(OVERRIDES).unwrap();
    let options = SynthesisOptions {
        postal_address: Some("1 Cyclotron Rd, Berkeley, CA 94720".to_string()),
        ..Default::default()
    };
    let mut ctx = SynthesisContext::new();
    let graph = TopologySynthesizer::new(&records, &options)
        .with_overrides(overrides.site("LBNL"))
        .synthesize(SubstrateGraph::new(), &mut ctx)
        .unwrap();

    assert!(graph.find_node("lbnl-data-sw").is_none());
    let switch = graph.find_node("lbnl-data-sw-alias").unwrap();
    let labels = &graph.node(switch).unwrap().labels;
    assert_eq!(labels.local_name.as_deref(), Some("lbnl-data-sw"));
    assert_eq!(labels.ipv4.as_deref(), Some("192.168.1.10"));

    let server = graph.find_node("lbnl-w1").unwrap();
    let capacities = graph.node_capacities(server).unwrap();
    assert_eq!(capacities.ram, Some(768));
    assert_eq!(capacities.disk, Some(1500));
    assert_eq!(
        graph.node(server).unwrap().location.as_deref(),
        Some("1 Cyclotron Rd, Berkeley, CA 94720")
    );

    assert_eq!(graph.facilities().len(), 2);
    assert_eq!(ctx.summary.facilities, 2);
    let dtn = graph
        .facilities()
        .iter()
        .find(|f| f.name == "RENCI-DTN")
        .unwrap();
    let dtn_port = graph.interface(dtn.interface).unwrap();
    assert_eq!(dtn_port.labels.vlan, ["2001"]);
    assert_eq!(dtn_port.capacities.mtu, Some(9000));
    let dtn_link = graph.link_of(dtn.interface).unwrap();
    assert_eq!(dtn_link.name, "RENCI-DTN-link");
    let stitch = graph.interface(dtn_link.interfaces[1]).unwrap();
    assert_eq!(stitch.name, "HundredGigE0/0/0/5");
    assert_eq!(stitch.labels.vlan_range.as_deref(), Some("2000-2100"));

    let cloud = graph
        .facilities()
        .iter()
        .find(|f| f.name == "Cloud-AZURE")
        .unwrap();
    let cloud_link = graph.link_of(cloud.interface).unwrap();
    assert_eq!(
        graph.interface(cloud_link.interfaces[1]).unwrap().name,
        "agg3.ashb:HundredGigE0/0/0/1"
    );
}

#[test]
fn test_facilities_share_stitch_and_cabled_ports() {
    let records = records(site());
    let overrides = StaticOverrides::from_yaml_str(
        r#"
LBNL:
  stitch_ports:
    - port: HundredGigE0/0/0/5
      peer: "AL2S agg3.ashb HundredGigE0/0/0/1"
      vlan_range: "2000-2100"
  facility_ports:
    FAC-A:
      stitch_port: Hundred GigE0/0/0/5
      description: RENCI data transfer node
      vlan_range: "2001"
    FAC-B:
      stitch_port: HundredGigE0/0/0/5
      vlan_range: "2002-2010"
    FAC-C:
      stitch_port: et1
"#,
    )
    .unwrap();
    let options = SynthesisOptions::default();
    let mut ctx = SynthesisContext::new();
    let graph = TopologySynthesizer::new(&records, &options)
        .with_overrides(overrides.site("LBNL"))
        .synthesize(SubstrateGraph::new(), &mut ctx)
        .unwrap();
    assert_eq!(ctx.summary.facilities, 3);

    let facility_port = |name: &str| {
        graph
            .facilities()
            .iter()
            .find(|f| f.name == name)
            .unwrap()
            .interface
    };
    let fac_a = graph.interface(facility_port("FAC-A")).unwrap();
    assert_eq!(fac_a.details.as_deref(), Some("RENCI data transfer node"));
    assert!(graph.interface(facility_port("FAC-B")).unwrap().details.is_none());

    let stitch = graph.link_of(facility_port("FAC-A")).unwrap().interfaces[1];
    assert_eq!(graph.interface(stitch).unwrap().name, "HundredGigE0/0/0/5");
    let on_stitch: Vec<_> = graph.links_of(stitch).map(|l| l.name.as_str()).collect();
    assert_eq!(on_stitch, ["FAC-A-link", "FAC-B-link"]);

    let et1 = graph.link_of(facility_port("FAC-C")).unwrap().interfaces[1];
    let on_et1: Vec<_> = graph
        .links_of(et1)
        .map(|l| (l.name.as_str(), l.link_type))
        .collect();
    assert_eq!(on_et1, [("l1", LinkType::Patch), ("FAC-C-link", LinkType::L2Path)]);
}

#[test]
fn test_p4_uplink_to_patched_port_is_skipped() {
    let mut value = site();
    value["p4_switch"] = json!({
        "name": "lbnl-p4-sw",
        "ports": [
            {"role": "PhysicalFunction", "mac": "B0:CF:0E:00:00:01", "bdf": "0000:01:00.0",
             "peer_port": "et1", "speed": "100 Gbps"},
            {"role": "PhysicalFunction", "mac": "B0:CF:0E:00:00:02", "bdf": "0000:01:00.1",
             "peer_port": "et9", "speed": "100 Gbps"}
        ]
    });
    let records = records(value);
    let (graph, ctx) = synthesize(&records).unwrap();

    assert_eq!(ctx.summary.patch_links, 3);
    let p4 = graph.find_node("lbnl-p4-sw").unwrap();
    let ports = graph.node_interfaces(p4);
    assert_eq!(ports.len(), 2);
    assert!(graph.link_of(ports[0]).is_none());
    let uplink = graph.link_of(ports[1]).unwrap();
    assert_eq!(uplink.link_type, LinkType::Patch);
    assert_eq!(graph.interface(uplink.interfaces[1]).unwrap().name, "et9");
}

#[test]
fn test_facility_without_stitch_port_is_ambiguous() {
    let records = records(site());
    let overrides = StaticOverrides::from_yaml_str(
        r#"
LBNL:
  facility_ports:
    Orphan:
      vlan_range: "100"
"#,
    )
    .unwrap();
    let options = SynthesisOptions::default();
    let result = TopologySynthesizer::new(&records, &options)
        .with_overrides(overrides.site("LBNL"))
        .synthesize(SubstrateGraph::new(), &mut SynthesisContext::new());
    match result {
        Err(SynthesisError::AmbiguousStitch { site, port }) => {
            assert_eq!(site, "LBNL");
            assert_eq!(port, "Orphan");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_facility_with_unknown_stitch_port_is_ambiguous() {
    let records = records(site());
    let overrides = StaticOverrides::from_yaml_str(
        r#"
LBNL:
  facility_ports:
    Nowhere:
      stitch_port: HundredGigE0/0/0/99
"#,
    )
    .unwrap();
    let options = SynthesisOptions::default();
    let result = TopologySynthesizer::new(&records, &options)
        .with_overrides(overrides.site("LBNL"))
        .synthesize(SubstrateGraph::new(), &mut SynthesisContext::new());
    assert!(matches!(
        result,
        Err(SynthesisError::AmbiguousStitch { .. })
    ));
}

#[test]
fn test_runs_sharing_a_context_number_links_in_sequence() {
    let first = records(site());
    let mut second = site();
    second["site"] = json!("STAR");
    second["workers"][0]["name"] = json!("star-w1");
    second["dp_switch"]["name"] = json!("star-data-sw");
    second["routers"][0]["name"] = json!("star-r1");
    let second = records(second);

    let options = SynthesisOptions::default();
    let mut ctx = SynthesisContext::new();
    let graph = TopologySynthesizer::new(&first, &options)
        .synthesize(SubstrateGraph::new(), &mut ctx)
        .unwrap();
    let graph = TopologySynthesizer::new(&second, &options)
        .synthesize(graph, &mut ctx)
        .unwrap();

    let names: Vec<_> = graph.links().iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["l1", "l2", "l3", "l4", "l5", "l6"]);
}

use cidr_sweep::netdetect::{ipv4_to_default_cidr, AddressBlock};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[test]
fn default_cidr_is_24() {
    let cidr = ipv4_to_default_cidr(Ipv4Addr::new(192, 168, 42, 99));
    assert_eq!(cidr.to_string(), "192.168.42.0/24");
}

#[test]
fn slash_30_yields_all_four_addresses() {
    let block = AddressBlock::parse("10.0.0.0/30").unwrap();
    let list: Vec<_> = block.addresses().collect();
    assert_eq!(
        list,
        vec![
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3)),
        ]
    );
}

#[test]
fn enumeration_is_complete_ascending_and_in_range() {
    for cidr in [
        "192.168.0.0/20",
        "10.255.255.0/24",
        "255.255.255.240/28",
        "172.16.4.7/31",
        "fd00::ff00/120",
    ] {
        let block = AddressBlock::parse(cidr).unwrap();
        let list: Vec<IpAddr> = block.addresses().collect();
        assert_eq!(list.len() as u128, block.len(), "{cidr}");
        assert!(list.windows(2).all(|w| w[0] < w[1]), "{cidr} not ascending");
        assert!(list.iter().all(|ip| block.contains(ip)), "{cidr} out of range");
        let distinct: HashSet<_> = list.iter().collect();
        assert_eq!(distinct.len(), list.len(), "{cidr} has duplicates");
        assert_eq!(list.first(), Some(&block.network()));
        assert_eq!(list.last(), Some(&block.last()));
    }
}

#[test]
fn ipv6_addresses_render_without_prefix() {
    let block = AddressBlock::parse("2001:db8::/127").unwrap();
    let text: Vec<String> = block.addresses().map(|ip| ip.to_string()).collect();
    assert_eq!(text, vec!["2001:db8::", "2001:db8::1"]);
    assert_eq!(
        block.network(),
        IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0))
    );
}

#[test]
fn large_block_is_lazy() {
    let block = AddressBlock::parse("10.0.0.0/8").unwrap();
    assert_eq!(block.len(), 1 << 24);
    let third = block.addresses().nth(2).unwrap();
    assert_eq!(third, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
}

#[test]
fn invalid_cidr_rejected() {
    assert!("not-a-cidr".parse::<AddressBlock>().is_err());
    assert!("300.0.0.0/8".parse::<AddressBlock>().is_err());
}

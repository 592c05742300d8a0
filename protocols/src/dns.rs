//! Reverse (PTR) DNS queries over plain UDP.

use std::net::IpAddr;

use anyhow::Context;
use pnet::packet::dns::{
    DnsClass, DnsPacket, DnsQuery, DnsResponse, DnsTypes, MutableDnsPacket, Opcode, Retcode,
};

use discovr_common::utils::ip;

pub const DNS_HDR_LEN: usize = 12;
pub const DNS_PORT: u16 = 53;

/// Extracts `(transaction id, hostname)` from a PTR answer.
pub fn get_hostname(payload: &[u8]) -> anyhow::Result<(u16, String)> {
    let dns = DnsPacket::new(payload).context("Failed to parse DNS packet")?;
    let transaction_id = dns.get_id();
    let hostname_res = dns
        .get_responses()
        .iter()
        .find_map(|response| match response.rtype {
            DnsTypes::PTR => response_from_ptr(response),
            _ => None,
        })
        .ok_or_else(|| anyhow::anyhow!("No valid PTR record found"))?;

    Ok((transaction_id, hostname_res))
}

pub fn create_ptr_packet(ip_addr: &IpAddr, id: u16) -> anyhow::Result<Vec<u8>> {
    let query: DnsQuery = create_ptr_query(ip_addr);
    let q_fixed_len: usize = 4;
    let qlen: usize = query.qname.len() + q_fixed_len;
    let total: usize = DNS_HDR_LEN + qlen;
    let mut buffer: Vec<u8> = vec![0u8; total];

    {
        let mut dns: MutableDnsPacket =
            MutableDnsPacket::new(&mut buffer).context("creating dns header")?;
        dns.set_id(id);
        dns.set_is_response(0);
        dns.set_opcode(Opcode::StandardQuery);
        dns.set_is_authoriative(0);
        dns.set_is_truncated(0);
        dns.set_is_recursion_desirable(1);
        dns.set_is_recursion_available(0);
        dns.set_zero_reserved(0);
        dns.set_is_non_authenticated_data(0);
        dns.set_rcode(Retcode::NoError);
        dns.set_query_count(1);
        dns.set_response_count(0);
        dns.set_authority_rr_count(0);
        dns.set_additional_rr_count(0);
    }

    // Manually Write the Query Bytes into the buffer
    let mut cursor: usize = DNS_HDR_LEN;

    buffer[cursor..cursor + query.qname.len()].copy_from_slice(&query.qname);
    cursor += query.qname.len();

    buffer[cursor..cursor + 2].copy_from_slice(&query.qtype.0.to_be_bytes());
    cursor += 2;

    buffer[cursor..cursor + 2].copy_from_slice(&query.qclass.0.to_be_bytes());

    Ok(buffer)
}

fn response_from_ptr(response: &DnsResponse) -> Option<String> {
    decode_dns_name(&response.data).filter(|name| !name.is_empty())
}

fn create_ptr_query(ip_addr: &IpAddr) -> DnsQuery {
    let ptr_string: String = ip::reverse_address_to_ptr(ip_addr);
    DnsQuery {
        qname: encode_dns_name(&ptr_string),
        qtype: DnsTypes::PTR,
        qclass: DnsClass(1),
        payload: Vec::new(),
    }
}

fn encode_dns_name(name: &str) -> Vec<u8> {
    let mut encoded: Vec<u8> = Vec::new();
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    encoded
}

/// Decodes uncompressed labels. Compression pointers end the name early.
fn decode_dns_name(data: &[u8]) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    let mut cursor: usize = 0;
    while cursor < data.len() {
        let len: usize = data[cursor] as usize;
        if len == 0 || len & 0xC0 == 0xC0 {
            break;
        }
        cursor += 1;
        if cursor + len > data.len() {
            return None;
        }
        let label: &str = std::str::from_utf8(&data[cursor..cursor + len]).ok()?;
        parts.push(label);
        cursor += len;
    }
    Some(parts.join("."))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn ptr_query_layout() {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let packet = create_ptr_packet(&ip, 0xBEEF).unwrap();

        assert_eq!(&packet[0..2], &[0xBE, 0xEF]);
        // one question, recursion desired
        assert_eq!(&packet[4..6], &[0, 1]);
        assert_eq!(packet[2] & 0x01, 0x01);

        let qname = encode_dns_name("1.0.0.10.in-addr.arpa");
        assert_eq!(&packet[DNS_HDR_LEN..DNS_HDR_LEN + qname.len()], qname.as_slice());
        // PTR / IN
        assert_eq!(&packet[packet.len() - 4..], &[0, 12, 0, 1]);
    }

    #[test]
    fn name_codec() {
        let encoded = encode_dns_name("printer.lan.");
        assert_eq!(encoded, b"\x07printer\x03lan\x00".to_vec());
        assert_eq!(decode_dns_name(&encoded), Some("printer.lan".to_string()));
    }

    #[test]
    fn compressed_suffix_is_cut() {
        let data = b"\x04host\xC0\x0C";
        assert_eq!(decode_dns_name(data), Some("host".to_string()));
    }

    #[test]
    fn truncated_label_is_rejected() {
        assert_eq!(decode_dns_name(b"\x09short"), None);
    }

    #[test]
    fn parses_ptr_answer() {
        let mut answer: Vec<u8> = vec![
            0x12, 0x34, // id
            0x81, 0x80, // standard response, no error
            0x00, 0x01, // one question
            0x00, 0x01, // one answer
            0x00, 0x00, 0x00, 0x00,
        ];
        let qname = encode_dns_name("1.0.0.10.in-addr.arpa");
        answer.extend_from_slice(&qname);
        answer.extend_from_slice(&[0x00, 0x0C, 0x00, 0x01]);

        let rdata = encode_dns_name("nas.lan");
        answer.extend_from_slice(&[0xC0, 0x0C]); // name pointer to question
        answer.extend_from_slice(&[0x00, 0x0C, 0x00, 0x01]);
        answer.extend_from_slice(&[0x00, 0x00, 0x0E, 0x10]);
        answer.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        answer.extend_from_slice(&rdata);

        let (id, hostname) = get_hostname(&answer).unwrap();
        assert_eq!(id, 0x1234);
        assert_eq!(hostname, "nas.lan");
    }
}

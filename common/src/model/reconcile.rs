use std::collections::HashMap;

use tracing::debug;

use super::asset::{AssetKey, AssetRecord};

/// Normalizes one collector's output.
///
/// Records without an address or a name are dropped. Records sharing an identity
/// collapse into the last one written, which keeps the position of the first.
pub fn reconcile<I>(records: I) -> Vec<AssetRecord>
where
    I: IntoIterator<Item = AssetRecord>,
{
    let mut positions: HashMap<AssetKey, usize> = HashMap::new();
    let mut reconciled: Vec<AssetRecord> = Vec::new();

    for record in records {
        let Some(key) = record.key() else {
            debug!("dropping unidentifiable {} record from {}", record.kind, record.origin);
            continue;
        };

        match positions.get(&key) {
            Some(&idx) => reconciled[idx] = record,
            None => {
                positions.insert(key, reconciled.len());
                reconciled.push(record);
            }
        }
    }

    reconciled
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::model::{Kind, Origin};

    fn host(last_octet: u8, name: &str) -> AssetRecord {
        AssetRecord::new(Kind::Host, Origin::Network)
            .with_address(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet)))
            .with_name(name)
    }

    #[test]
    fn last_write_wins_in_first_position() {
        let records = vec![host(1, "old"), host(2, "other"), host(1, "new")];
        let reconciled = reconcile(records);

        assert_eq!(reconciled.len(), 2);
        assert_eq!(reconciled[0].name, "new");
        assert_eq!(reconciled[1].name, "other");
    }

    #[test]
    fn name_identifies_addressless_records() {
        let first = AssetRecord::new(Kind::StorageBucket, Origin::Aws)
            .with_name("backups")
            .in_partition("global");
        let second = AssetRecord::new(Kind::StorageBucket, Origin::Aws)
            .with_name("backups")
            .in_partition("eu-west-1");

        let reconciled = reconcile(vec![first, second]);
        assert_eq!(reconciled.len(), 1);
        assert_eq!(reconciled[0].partition, "eu-west-1");
    }

    #[test]
    fn unidentifiable_records_are_dropped() {
        let anonymous = AssetRecord::new(Kind::Host, Origin::Network);
        let reconciled = reconcile(vec![anonymous, host(3, "kept")]);
        assert_eq!(reconciled.len(), 1);
        assert_eq!(reconciled[0].name, "kept");
    }
}

//! Overlap grouping of discovered services.

use felica_core::{ServiceCode, ServiceGroup};

/// Partition `services` into overlap groups.
///
/// Groups are contiguous runs of the input, so flattening the result gives
/// back the input unchanged. A code joins the open group when it overlaps
/// the group's last member (see [`ServiceCode::overlaps`]).
///
/// # Examples
///
/// ```
/// use felica_core::ServiceCode;
/// use felica_reader::group_overlapped_services;
///
/// let services: Vec<ServiceCode> =
///     [0x0100, 0x0101, 0x0108].into_iter().map(ServiceCode::new).collect();
/// let groups = group_overlapped_services(&services);
///
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].members(), &services[..2]);
/// assert_eq!(groups[1].members(), &services[2..]);
/// ```
pub fn group_overlapped_services(services: &[ServiceCode]) -> Vec<ServiceGroup> {
    let mut groups: Vec<ServiceGroup> = Vec::new();

    for &code in services {
        match groups.last_mut() {
            Some(open) if code.overlaps(open.last()) => open.push(code),
            _ => groups.push(ServiceGroup::single(code)),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn codes(values: &[u16]) -> Vec<ServiceCode> {
        values.iter().copied().map(ServiceCode::new).collect()
    }

    fn grouped(values: &[u16]) -> Vec<Vec<u16>> {
        group_overlapped_services(&codes(values))
            .iter()
            .map(|g| g.iter().map(ServiceCode::as_u16).collect())
            .collect()
    }

    #[rstest]
    #[case(&[], vec![])]
    #[case(&[0x090F], vec![vec![0x090F]])]
    #[case(&[0x0100, 0x0101, 0x0108], vec![vec![0x0100, 0x0101], vec![0x0108]])]
    // purse variants share code >> 4 and group regardless of code >> 2
    #[case(&[0x1710, 0x1712, 0x1714, 0x1717], vec![vec![0x1710, 0x1712, 0x1714, 0x1717]])]
    // random then cyclic with the same >> 4 split on >> 2
    #[case(&[0x1008, 0x100B, 0x100C, 0x100F], vec![vec![0x1008, 0x100B], vec![0x100C, 0x100F]])]
    fn test_grouping(#[case] input: &[u16], #[case] expected: Vec<Vec<u16>>) {
        assert_eq!(grouped(input), expected);
    }

    #[test]
    fn test_grouping_is_not_sorted() {
        // Same service split by another one stays split.
        assert_eq!(
            grouped(&[0x1008, 0x2008, 0x100B]),
            vec![vec![0x1008], vec![0x2008], vec![0x100B]]
        );
    }
}

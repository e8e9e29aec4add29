//! Encoding-group layout, as consumed from the cluster map.

use std::collections::HashMap;

use reef_types::{GroupId, VolumeId};

/// One member volume of an encoding group and where it is hosted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// The member volume.
    pub volume: VolumeId,
    /// Base URL of the node hosting the volume.
    pub endpoint: String,
}

/// Read-only view of encoding-group membership.
///
/// Members are ordered: index 0 is the group leader, which materializes the
/// compressed parity object; members `1..` each receive one global parity
/// shard during distribution.
pub trait GroupView: Send + Sync {
    /// The ordered members of `group`, or `None` if the group is unknown.
    fn members(&self, group: GroupId) -> Option<Vec<GroupMember>>;
}

/// [`GroupView`] over a fixed table, built from configuration at startup.
#[derive(Debug, Default)]
pub struct StaticGroupView {
    groups: HashMap<GroupId, Vec<GroupMember>>,
}

impl StaticGroupView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group's ordered member list.
    pub fn insert(&mut self, group: GroupId, members: Vec<GroupMember>) {
        self.groups.insert(group, members);
    }
}

impl GroupView for StaticGroupView {
    fn members(&self, group: GroupId) -> Option<Vec<GroupMember>> {
        self.groups.get(&group).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_view_lookup() {
        let mut view = StaticGroupView::new();
        view.insert(
            GroupId(4),
            vec![
                GroupMember {
                    volume: VolumeId(0),
                    endpoint: "http://a:4830".to_string(),
                },
                GroupMember {
                    volume: VolumeId(1),
                    endpoint: "http://b:4830".to_string(),
                },
            ],
        );
        let members = view.members(GroupId(4)).unwrap();
        assert_eq!(members[0].volume, VolumeId(0));
        assert_eq!(members[1].endpoint, "http://b:4830");
        assert!(view.members(GroupId(5)).is_none());
    }
}

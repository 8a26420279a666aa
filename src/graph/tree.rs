//! Topic tree: every topic endpoint grouped under its topic name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use topowatch_types::{Direction, Topic};

/// One leaf of the topic tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicTreeItem {
    pub tname: String,
    pub direction: Direction,
    pub hname: String,
    pub pid: i64,
    pub tid: String,
    pub pname: String,
    pub uname: String,
}

impl From<&Topic> for TopicTreeItem {
    fn from(topic: &Topic) -> Self {
        Self {
            tname: topic.tname.clone(),
            direction: topic.direction,
            hname: topic.hname.clone(),
            pid: topic.pid,
            tid: topic.tid.clone(),
            pname: topic.pname.clone(),
            uname: topic.uname.clone(),
        }
    }
}

/// Topic endpoints sorted by topic name, then direction, host and pid.
pub fn topic_tree(topics: &BTreeMap<String, Topic>) -> Vec<TopicTreeItem> {
    let mut items: Vec<TopicTreeItem> = topics.values().map(TopicTreeItem::from).collect();
    items.sort();
    items
}

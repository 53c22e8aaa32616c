//! 分桶链表
//!
//! 每个分桶用下标实现的双向链表管理当前归属它的缓存块。节点表按缓存块
//! 编号索引，`Some` 表示该缓存块在本分桶中；缓存块的记账信息 [`SlotMeta`]
//! 跟随节点一起在分桶之间迁移。
//!
//! 所有操作都要求调用者持有分桶锁（即持有 `&mut BucketList`）。

use super::slot::SlotMeta;
use crate::types::BlockId;
use alloc::vec::Vec;

#[derive(Debug, Clone, Copy)]
struct Node {
    meta: SlotMeta,
    prev: Option<usize>,
    next: Option<usize>,
}

/// 单个分桶的缓存块链表
#[derive(Debug)]
pub struct BucketList {
    head: Option<usize>,
    len: usize,
    nodes: Vec<Option<Node>>,
}

impl BucketList {
    /// 创建空链表，`nbuf` 为缓存块总数
    pub fn new(nbuf: usize) -> Self {
        Self {
            head: None,
            len: 0,
            nodes: alloc::vec![None; nbuf],
        }
    }

    /// 链表长度
    pub fn len(&self) -> usize {
        self.len
    }

    /// 链表是否为空
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 缓存块是否在本分桶中
    pub fn contains(&self, slot: usize) -> bool {
        matches!(self.nodes.get(slot), Some(Some(_)))
    }

    /// 把缓存块插入链表头部
    pub fn insert(&mut self, slot: usize, meta: SlotMeta) {
        debug_assert!(!self.contains(slot), "slot {} already linked", slot);

        let old_head = self.head;
        if let Some(h) = old_head {
            if let Some(head) = self.nodes[h].as_mut() {
                head.prev = Some(slot);
            }
        }
        self.nodes[slot] = Some(Node {
            meta,
            prev: None,
            next: old_head,
        });
        self.head = Some(slot);
        self.len += 1;
    }

    /// 从链表中摘下缓存块，返回它的记账信息
    ///
    /// 缓存块不在本分桶时返回 None。
    pub fn remove(&mut self, slot: usize) -> Option<SlotMeta> {
        let node = self.nodes.get_mut(slot)?.take()?;

        match node.prev {
            Some(prev) => {
                if let Some(p) = self.nodes[prev].as_mut() {
                    p.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        if let Some(next) = node.next {
            if let Some(n) = self.nodes[next].as_mut() {
                n.prev = node.prev;
            }
        }

        self.len -= 1;
        Some(node.meta)
    }

    /// 查找持有 `id` 的缓存块
    pub fn find(&self, id: BlockId) -> Option<usize> {
        self.iter().find(|&slot| self.meta(slot).is_some_and(|m| m.holds(id)))
    }

    /// 缓存块的记账信息
    pub fn meta(&self, slot: usize) -> Option<&SlotMeta> {
        self.nodes.get(slot)?.as_ref().map(|n| &n.meta)
    }

    /// 缓存块的记账信息（可变）
    pub fn meta_mut(&mut self, slot: usize) -> Option<&mut SlotMeta> {
        self.nodes.get_mut(slot)?.as_mut().map(|n| &mut n.meta)
    }

    /// 从头到尾遍历缓存块编号
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cur: self.head,
        }
    }
}

/// 链表遍历器
pub struct Iter<'a> {
    list: &'a BucketList,
    cur: Option<usize>,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let slot = self.cur?;
        self.cur = self.list.nodes[slot].as_ref().and_then(|n| n.next);
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn order(list: &BucketList) -> Vec<usize> {
        list.iter().collect()
    }

    #[test]
    fn test_insert_prepends() {
        let mut list = BucketList::new(8);
        assert!(list.is_empty());

        list.insert(1, SlotMeta::new(0));
        list.insert(4, SlotMeta::new(0));
        list.insert(6, SlotMeta::new(0));

        assert_eq!(order(&list), [6, 4, 1]);
        assert_eq!(list.len(), 3);
        assert!(list.contains(4));
        assert!(!list.contains(0));
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let mut list = BucketList::new(8);
        for slot in [0, 1, 2, 3, 4] {
            list.insert(slot, SlotMeta::new(slot as u64));
        }
        assert_eq!(order(&list), [4, 3, 2, 1, 0]);

        // 中间
        let meta = list.remove(2).unwrap();
        assert_eq!(meta.last_release, 2);
        assert_eq!(order(&list), [4, 3, 1, 0]);

        // 头部
        list.remove(4).unwrap();
        assert_eq!(order(&list), [3, 1, 0]);

        // 尾部
        list.remove(0).unwrap();
        assert_eq!(order(&list), [3, 1]);

        // 不在链表中
        assert!(list.remove(0).is_none());
        assert!(list.remove(100).is_none());
        assert_eq!(list.len(), 2);

        // 摘下后可以重新插入
        list.insert(2, meta);
        assert_eq!(order(&list), [2, 3, 1]);
    }

    #[test]
    fn test_remove_only_node() {
        let mut list = BucketList::new(2);
        list.insert(1, SlotMeta::new(0));
        list.remove(1).unwrap();
        assert!(list.is_empty());
        assert!(order(&list).is_empty());
        list.insert(0, SlotMeta::new(0));
        assert_eq!(order(&list), [0]);
    }

    #[test]
    fn test_find_and_meta_follow_node() {
        let id = BlockId::new(1, 9);
        let mut list = BucketList::new(4);
        list.insert(0, SlotMeta::new(0));
        list.insert(3, SlotMeta::new(0));
        assert_eq!(list.find(id), None);

        let meta = list.meta_mut(0).unwrap();
        meta.identity = Some(id);
        meta.ref_count = 2;
        assert_eq!(list.find(id), Some(0));

        // 迁移到另一个分桶时记账信息随节点带走
        let mut other = BucketList::new(4);
        let meta = list.remove(0).unwrap();
        other.insert(0, meta);
        assert_eq!(list.find(id), None);
        assert_eq!(other.find(id), Some(0));
        assert_eq!(other.meta(0).unwrap().ref_count, 2);
    }
}

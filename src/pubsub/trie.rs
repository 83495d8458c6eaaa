use std::collections::HashMap;

use super::topic::{invalid, TopicPath, WILDCARD};
use crate::error::BusResult;

/// Куда попал слушатель при подписке.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    /// Подписка ровно на топик, заканчивающийся в узле.
    Exact,
    /// Подписка `prefix:*` на узел и всё под ним.
    Subtree,
}

/// Копия списка слушателей одного узла, снятая во время обхода.
///
/// Единица работы диспетчера: каждый снимок доставляется своей задачей.
#[derive(Debug, Clone)]
pub struct ListenerSnapshot<L> {
    pub kind: ListenerKind,
    /// Глубина узла, у корня 0.
    pub depth: usize,
    pub listeners: Vec<L>,
}

#[derive(Debug)]
struct TrieNode<L> {
    children: HashMap<String, TrieNode<L>>,
    exact: Vec<L>,
    subtree: Vec<L>,
}

impl<L> Default for TrieNode<L> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            exact: Vec::new(),
            subtree: Vec::new(),
        }
    }
}

/// Префиксное дерево топиков.
///
/// Узлы создаются лениво при подписке через литеральный сегмент; `*` никогда
/// не становится ключом потомка, а только добавляет слушателя в `subtree`
/// текущего узла. Списки слушателей только растут (отписки нет).
#[derive(Debug)]
pub struct TopicTrie<L> {
    root: TrieNode<L>,
}

impl<L> Default for TopicTrie<L> {
    fn default() -> Self {
        Self {
            root: TrieNode::default(),
        }
    }
}

// Рекурсивный drop вложенных HashMap переполнил бы стек на глубоких топиках.
impl<L> Drop for TopicTrie<L> {
    fn drop(&mut self) {
        let mut stack: Vec<TrieNode<L>> = self.root.children.drain().map(|(_, n)| n).collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.children.drain().map(|(_, n)| n));
        }
    }
}

impl<L: Clone> TopicTrie<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует слушателя.
    ///
    /// `*` допустима только последним сегментом. Позиция проверяется до
    /// любых изменений, так что отклонённая подписка не трогает дерево.
    pub fn subscribe(
        &mut self,
        topic: &TopicPath,
        listener: L,
    ) -> BusResult<ListenerKind> {
        let segments = topic.segments();
        if let Some(pos) = segments.iter().position(|s| s == WILDCARD) {
            if pos + 1 != segments.len() {
                return Err(invalid(
                    topic.as_str(),
                    "a wildcard is only allowed at the end of a topic",
                ));
            }
        }

        let mut node = &mut self.root;
        for segment in segments {
            if segment == WILDCARD {
                node.subtree.push(listener);
                return Ok(ListenerKind::Subtree);
            }
            node = node.children.entry(segment.clone()).or_default();
        }
        node.exact.push(listener);
        Ok(ListenerKind::Exact)
    }

    /// Существует ли литеральный путь для всех сегментов топика.
    ///
    /// Подписки `*` путь не создают: топик, достижимый только через
    /// wildcard-предка, считается несуществующим.
    pub fn exists(&self, topic: &TopicPath) -> bool {
        let mut node = &self.root;
        for segment in topic.segments() {
            match node.children.get(segment.as_str()) {
                Some(child) => node = child,
                None => return false,
            }
        }
        true
    }

    /// Обходит дерево по сегментам топика и снимает копии списков слушателей.
    ///
    /// В каждом пройденном узле (включая корень) берутся `subtree`-слушатели;
    /// в конечном узле дополнительно `exact`. Отсутствующий потомок просто
    /// останавливает обход. Пустые списки не попадают в результат.
    pub fn collect(&self, topic: &TopicPath) -> Vec<ListenerSnapshot<L>> {
        let mut snapshots = Vec::new();
        let mut node = &self.root;
        let mut remaining = topic.segments();
        let mut depth = 0;

        loop {
            if !node.subtree.is_empty() {
                snapshots.push(ListenerSnapshot {
                    kind: ListenerKind::Subtree,
                    depth,
                    listeners: node.subtree.clone(),
                });
            }

            let Some((head, rest)) = remaining.split_first() else {
                if !node.exact.is_empty() {
                    snapshots.push(ListenerSnapshot {
                        kind: ListenerKind::Exact,
                        depth,
                        listeners: node.exact.clone(),
                    });
                }
                break;
            };

            match node.children.get(head.as_str()) {
                Some(child) => {
                    node = child;
                    remaining = rest;
                    depth += 1;
                }
                None => break,
            }
        }

        snapshots
    }

    /// Число узлов без учёта корня.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += node.children.len();
            stack.extend(node.children.values());
        }
        count
    }

    /// Общее число зарегистрированных слушателей.
    pub fn listener_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += node.exact.len() + node.subtree.len();
            stack.extend(node.children.values());
        }
        count
    }

    /// Все литеральные пути дерева в лексикографическом порядке.
    pub fn topics(&self) -> Vec<String> {
        let mut topics = Vec::new();
        let mut stack: Vec<(String, &TrieNode<L>)> = self
            .root
            .children
            .iter()
            .map(|(segment, child)| (segment.clone(), child))
            .collect();

        while let Some((path, node)) = stack.pop() {
            for (segment, child) in &node.children {
                stack.push((format!("{path}:{segment}"), child));
            }
            topics.push(path);
        }

        topics.sort();
        topics
    }
}

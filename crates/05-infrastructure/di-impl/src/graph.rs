//! 依赖图与拓扑排序
//!
//! 依赖图记录每个描述符在实例化和注入期间请求过的能力，只用于计算释放顺序。

use infrastructure_common::Capability;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

/// 依赖关系多重映射
///
/// 键是描述符在容器中的注册序号，值是该描述符按请求顺序请求过的能力（去重）。
#[derive(Debug, Default)]
pub struct DependencyGraph {
    requests: BTreeMap<usize, Vec<Capability>>,
}

impl DependencyGraph {
    /// 创建空依赖图
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条依赖关系，返回是否为新记录
    pub fn record(&mut self, requester: usize, capability: Capability) -> bool {
        let requested = self.requests.entry(requester).or_default();
        if requested.contains(&capability) {
            return false;
        }
        requested.push(capability);
        true
    }

    /// 描述符请求过的全部能力
    pub fn requests(&self, requester: usize) -> &[Capability] {
        self.requests.get(&requester).map_or(&[], Vec::as_slice)
    }

    /// 依赖关系总数
    pub fn edge_count(&self) -> usize {
        self.requests.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }

    /// 沿已记录的依赖查找从 `from` 到 `to` 的路径
    ///
    /// `providers` 把能力映射为满足它的描述符序号。找到时返回包含两端的路径。
    pub fn find_path<F>(&self, from: usize, to: usize, mut providers: F) -> Option<Vec<usize>>
    where
        F: FnMut(&Capability) -> Vec<usize>,
    {
        let mut path = vec![from];
        if from == to {
            return Some(path);
        }

        let mut visited = HashSet::from([from]);
        let mut stack = vec![self.successors(from, &mut providers).into_iter()];

        while let Some(successors) = stack.last_mut() {
            match successors.next() {
                Some(next) if next == to => {
                    path.push(next);
                    return Some(path);
                }
                Some(next) => {
                    if visited.insert(next) {
                        path.push(next);
                        let next_successors = self.successors(next, &mut providers);
                        stack.push(next_successors.into_iter());
                    }
                }
                None => {
                    stack.pop();
                    path.pop();
                }
            }
        }

        None
    }

    fn successors<F>(&self, node: usize, providers: &mut F) -> Vec<usize>
    where
        F: FnMut(&Capability) -> Vec<usize>,
    {
        self.requests(node).iter().flat_map(|c| providers(c)).collect()
    }
}

/// 拓扑排序结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologicalOrder<T> {
    /// 依赖方在前、被依赖方在后的全序
    pub order: Vec<T>,
    /// 为打破循环而忽略的依赖 `(依赖方, 被依赖方)`
    pub broken_edges: Vec<(T, T)>,
}

impl<T> TopologicalOrder<T> {
    /// 是否存在循环
    pub fn has_cycles(&self) -> bool {
        !self.broken_edges.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// 拓扑排序
///
/// 输出中每个元素都排在它所依赖的元素之前，也就是依赖方先于被依赖方。
/// 按 `items` 的顺序深度优先遍历，依赖按 `dependencies` 返回的顺序访问，
/// 因此结果是确定的；互不相关的元素按与 `items` 相反的顺序输出。
///
/// 遇到循环时忽略回边：循环中最先被访问到的元素排在最前，
/// 被忽略的边记录在 [`TopologicalOrder::broken_edges`] 中。
pub fn topological_sort<T, F>(items: &[T], mut dependencies: F) -> TopologicalOrder<T>
where
    T: Copy + Eq + Hash,
    F: FnMut(T) -> Vec<T>,
{
    let mut marks: HashMap<T, Mark> = HashMap::with_capacity(items.len());
    let mut post_order = Vec::with_capacity(items.len());
    let mut broken_edges = Vec::new();

    for &root in items {
        if marks.contains_key(&root) {
            continue;
        }

        marks.insert(root, Mark::Visiting);
        let mut stack = vec![(root, dependencies(root).into_iter())];

        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            match pending.next() {
                Some(next) => match marks.get(&next) {
                    None => {
                        marks.insert(next, Mark::Visiting);
                        stack.push((next, dependencies(next).into_iter()));
                    }
                    Some(Mark::Visiting) => broken_edges.push((node, next)),
                    Some(Mark::Done) => {}
                },
                None => {
                    marks.insert(node, Mark::Done);
                    post_order.push(node);
                    stack.pop();
                }
            }
        }
    }

    post_order.reverse();
    TopologicalOrder {
        order: post_order,
        broken_edges,
    }
}

//! DOM 操作模块
//!
//! 宿主文档以 html5ever 的 `RcDom` 表示，这里提供：
//!
//! - `node`: 解析、属性读写、查询与树结构修改
//! - `selectors`: 目标站点的选择器表
//! - `serializer`: 文档序列化

pub mod node;
pub mod selectors;
pub mod serializer;

pub use node::{
    append_child, clear_children, closest, create_element, create_text, deep_clone, descendants,
    detach, document_of, document_positions, find_descendant, find_descendants,
    find_descendants_within, get_node_attr, get_node_name, get_parent_node, has_ancestor_until,
    html_to_dom, insert_after, is_attached, is_element, same_node, set_node_attr, text_content,
};
pub use selectors::{matches_any, AttrMatch, Selector};
pub use serializer::{serialize_document, serialize_node};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> std::io::Result<RcDom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 是否为元素节点
pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 设置节点属性，`None` 表示移除
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<&str>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value);
                } else {
                    // Remove attr completely if attr_value is not defined
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            if let Some(attr_value) = attr_value {
                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 获取父节点
///
/// `Node::parent` 是 `Cell`，读取后必须放回。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 判断两个句柄是否指向同一个节点
pub fn same_node(a: &Handle, b: &Handle) -> bool {
    Rc::ptr_eq(a, b)
}

/// 按先序遍历收集所有后代元素（不含自身）
pub fn descendants(node: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_descendants(node, &mut |_| true, &mut found, usize::MAX);
    found
}

/// 收集满足条件的后代元素（不含自身），保持文档顺序
pub fn find_descendants<F>(node: &Handle, mut predicate: F) -> Vec<Handle>
where
    F: FnMut(&Handle) -> bool,
{
    let mut found = Vec::new();
    collect_descendants(node, &mut predicate, &mut found, usize::MAX);
    found
}

/// 在限定深度内收集满足条件的后代元素
pub fn find_descendants_within<F>(node: &Handle, max_depth: usize, mut predicate: F) -> Vec<Handle>
where
    F: FnMut(&Handle) -> bool,
{
    let mut found = Vec::new();
    collect_descendants(node, &mut predicate, &mut found, max_depth);
    found
}

fn collect_descendants<F>(node: &Handle, predicate: &mut F, found: &mut Vec<Handle>, depth: usize)
where
    F: FnMut(&Handle) -> bool,
{
    if depth == 0 {
        return;
    }

    for child in node.children.borrow().iter() {
        if is_element(child) {
            if predicate(child) {
                found.push(child.clone());
            }
            collect_descendants(child, predicate, found, depth - 1);
        }
    }
}

/// 查找第一个满足条件的后代元素
pub fn find_descendant<F>(node: &Handle, mut predicate: F) -> Option<Handle>
where
    F: FnMut(&Handle) -> bool,
{
    fn visit<F: FnMut(&Handle) -> bool>(node: &Handle, predicate: &mut F) -> Option<Handle> {
        for child in node.children.borrow().iter() {
            if !is_element(child) {
                continue;
            }
            if predicate(child) {
                return Some(child.clone());
            }
            if let Some(found) = visit(child, predicate) {
                return Some(found);
            }
        }
        None
    }

    visit(node, &mut predicate)
}

/// 从自身开始向上查找第一个满足条件的祖先
pub fn closest<F>(node: &Handle, mut predicate: F) -> Option<Handle>
where
    F: FnMut(&Handle) -> bool,
{
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if is_element(&candidate) && predicate(&candidate) {
            return Some(candidate);
        }
        current = get_parent_node(&candidate);
    }
    None
}

/// `node` 到 `stop`（不含）之间是否存在满足条件的祖先（含自身）
pub fn has_ancestor_until<F>(node: &Handle, stop: &Handle, mut predicate: F) -> bool
where
    F: FnMut(&Handle) -> bool,
{
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if same_node(&candidate, stop) {
            return false;
        }
        if is_element(&candidate) && predicate(&candidate) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 节点是否仍挂在某个文档之下
pub fn is_attached(node: &Handle) -> bool {
    document_of(node).is_some()
}

/// 获取节点所属的文档根
pub fn document_of(node: &Handle) -> Option<Handle> {
    let mut current = node.clone();
    loop {
        if let NodeData::Document = current.data {
            return Some(current);
        }
        current = get_parent_node(&current)?;
    }
}

/// 节点的文本内容
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    push_text(node, &mut out);
    out
}

fn push_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } | NodeData::Document => {
            for child in node.children.borrow().iter() {
                push_text(child, out);
            }
        }
        _ => {}
    }
}

/// 为整棵树计算先序位置，用于按文档顺序排序
pub fn document_positions(root: &Handle) -> HashMap<*const Node, usize> {
    let mut positions = HashMap::new();
    let mut index = 0usize;
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        positions.insert(Rc::as_ptr(&node), index);
        index += 1;
        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    positions
}

/// 深拷贝子树，拷贝不挂在任何父节点下
pub fn deep_clone(node: &Handle) -> Handle {
    let data = match &node.data {
        NodeData::Element {
            name,
            attrs,
            mathml_annotation_xml_integration_point,
            ..
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::ProcessingInstruction { target, contents } => NodeData::ProcessingInstruction {
            target: target.clone(),
            contents: contents.clone(),
        },
    };

    let copy = Node::new(data);
    for child in node.children.borrow().iter() {
        append_child(&copy, &deep_clone(child));
    }
    copy
}

/// 创建元素节点
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(
            attrs
                .iter()
                .map(|(name, value)| Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(*name)),
                    value: format_tendril!("{}", value),
                })
                .collect(),
        ),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 创建文本节点
pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

/// 追加子节点
pub fn append_child(parent: &Handle, child: &Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// 在 `anchor` 之后插入兄弟节点，`anchor` 已脱离文档树时返回 false
pub fn insert_after(anchor: &Handle, node: &Handle) -> bool {
    let Some(parent) = get_parent_node(anchor) else {
        return false;
    };

    let mut children = parent.children.borrow_mut();
    let Some(position) = children.iter().position(|child| same_node(child, anchor)) else {
        return false;
    };

    node.parent.set(Some(Rc::downgrade(&parent)));
    children.insert(position + 1, node.clone());
    true
}

/// 从父节点中移除
pub fn detach(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !same_node(child, node));
    }
    node.parent.set(None);
}

/// 清空所有子节点
pub fn clear_children(node: &Handle) {
    for child in node.children.borrow_mut().drain(..) {
        child.parent.set(None);
    }
}

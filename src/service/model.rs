//! Blog post record as stored in the document collection

use crate::engine::ObjectId;
use crate::proto;
use crate::service::codec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogItem {
    /// Assigned by the engine on insert; absent before that.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub author_id: String,
    pub content: String,
    pub title: String,
}

impl BlogItem {
    /// A record that has not been stored yet.
    pub fn new(author_id: String, title: String, content: String) -> Self {
        Self {
            id: None,
            author_id,
            content,
            title,
        }
    }

    /// Build an unsaved record from the wire shape. Any id on the wire is ignored.
    pub fn from_proto(blog: proto::Blog) -> Self {
        Self::new(blog.author_id, blog.title, blog.content)
    }

    /// Overwrite every caller-supplied field.
    pub fn replace_fields(&mut self, blog: proto::Blog) {
        self.author_id = blog.author_id;
        self.title = blog.title;
        self.content = blog.content;
    }

    pub fn to_proto(&self) -> proto::Blog {
        proto::Blog {
            id: self.id.as_ref().map(codec::encode).unwrap_or_default(),
            author_id: self.author_id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unsaved_has_no_id_field() {
        let item = BlogItem::new("a".into(), "t".into(), "c".into());
        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("_id").is_none());
        assert_eq!(value["author_id"], "a");
    }

    #[test]
    fn test_decode_stored_document() {
        let doc = json!({
            "_id": { "$oid": "0102030405060708090a0b0c" },
            "author_id": "siddharth",
            "content": "Content of my first blog",
            "title": "My First Blog",
        });
        let item: BlogItem = serde_json::from_value(doc).unwrap();
        let blog = item.to_proto();
        assert_eq!(blog.id, "0102030405060708090a0b0c");
        assert_eq!(blog.author_id, "siddharth");
        assert_eq!(blog.title, "My First Blog");
        assert_eq!(blog.content, "Content of my first blog");
    }

    #[test]
    fn test_missing_field_fails() {
        assert!(serde_json::from_value::<BlogItem>(json!({ "title": "only" })).is_err());
    }

    #[test]
    fn test_from_proto_ignores_id() {
        let item = BlogItem::from_proto(proto::Blog {
            id: "0102030405060708090a0b0c".into(),
            author_id: "a".into(),
            title: "t".into(),
            content: "c".into(),
        });
        assert!(item.id.is_none());
        assert_eq!(item.to_proto().id, "");
    }

    #[test]
    fn test_replace_fields() {
        let id = ObjectId::new();
        let mut item = BlogItem {
            id: Some(id),
            ..BlogItem::new("a".into(), "t".into(), "c".into())
        };
        item.replace_fields(proto::Blog {
            id: String::new(),
            author_id: "a2".into(),
            title: String::new(),
            content: "c2".into(),
        });
        assert_eq!(item.id, Some(id));
        assert_eq!(item.author_id, "a2");
        assert_eq!(item.title, "");
        assert_eq!(item.content, "c2");
    }
}

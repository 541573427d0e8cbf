use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};

use common::id::ObjectId;

const SEPARATOR: char = '/';

/// Materialized path of a directory, root first.
///
/// Stored as `/root/child/grandchild/` so that "is inside the subtree of X"
/// is `instr(path, '/' || X || '/') > 0` in SQL.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct DPath(Vec<ObjectId>);

impl DPath {
    pub fn encode(&self) -> String {
        let mut out = String::from(SEPARATOR);
        for id in &self.0 {
            out.push_str(&id.to_string());
            out.push(SEPARATOR);
        }
        out
    }

    pub fn parse(s: &str) -> Result<Self, BoxDynError> {
        if s == "/" {
            return Ok(Self(Vec::new()));
        }
        let inner = s
            .strip_prefix(SEPARATOR)
            .and_then(|s| s.strip_suffix(SEPARATOR))
            .ok_or_else(|| format!("malformed path {:?}", s))?;
        let ids = inner
            .split(SEPARATOR)
            .map(ObjectId::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(ids))
    }
}

impl From<Vec<ObjectId>> for DPath {
    fn from(ids: Vec<ObjectId>) -> Self {
        Self(ids)
    }
}

impl From<DPath> for Vec<ObjectId> {
    fn from(val: DPath) -> Self {
        val.0
    }
}

impl std::ops::Deref for DPath {
    type Target = [ObjectId];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Decode<'_, Sqlite> for DPath {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<Sqlite>>::decode(value)?;
        Self::parse(&s)
    }
}

impl Encode<'_, Sqlite> for DPath {
    fn encode_by_ref(
        &self,
        args: &mut Vec<SqliteArgumentValue<'_>>,
    ) -> Result<IsNull, BoxDynError> {
        args.push(SqliteArgumentValue::Text(self.encode().into()));
        Ok(IsNull::No)
    }
}

impl Type<Sqlite> for DPath {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::id::IdKind;

    #[test]
    fn test_encode_parse() {
        let root = ObjectId::new(IdKind::Directory);
        let child = ObjectId::new(IdKind::Directory);
        let path = DPath::from(vec![root.clone(), child.clone()]);

        let text = DPath::encode(&path);
        assert_eq!(text, format!("/{}/{}/", root, child));
        assert_eq!(DPath::parse(&text).unwrap(), path);
    }

    #[test]
    fn test_empty_and_malformed() {
        assert!(DPath::parse("/").unwrap().is_empty());
        assert!(DPath::parse("").is_err());
        assert!(DPath::parse("/dnotanid/").is_err());
        assert!(DPath::parse("no-slashes").is_err());
    }
}

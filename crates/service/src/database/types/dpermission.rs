use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};

use common::permission::Permission;

/// Permission bits as an INTEGER column
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default)]
pub struct DPermission(Permission);

impl From<DPermission> for Permission {
    fn from(val: DPermission) -> Self {
        val.0
    }
}

impl From<Permission> for DPermission {
    fn from(p: Permission) -> Self {
        Self(p)
    }
}

impl std::ops::Deref for DPermission {
    type Target = Permission;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Decode<'_, Sqlite> for DPermission {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let bits = <i64 as Decode<Sqlite>>::decode(value)?;
        Permission::from_stored(bits)
            .map(Self)
            .ok_or_else(|| format!("invalid permission bits {}", bits).into())
    }
}

impl Encode<'_, Sqlite> for DPermission {
    fn encode_by_ref(
        &self,
        args: &mut Vec<SqliteArgumentValue<'_>>,
    ) -> Result<IsNull, BoxDynError> {
        args.push(SqliteArgumentValue::Int64(i64::from(self.0.bits())));
        Ok(IsNull::No)
    }
}

impl Type<Sqlite> for DPermission {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <i64 as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <i64 as Type<Sqlite>>::type_info()
    }
}

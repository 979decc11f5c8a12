//! Protobuf message definitions shared by requests and responses.
//!
//! These mirror the service's `common.proto` schema. Field tags are part of the wire
//! contract and must not change.
use std::collections::HashMap;

/// Representation kind of a [`TypedValue`] or a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Rep {
    PrimitiveBoolean = 0,
    PrimitiveByte = 1,
    PrimitiveChar = 2,
    PrimitiveShort = 3,
    PrimitiveInt = 4,
    PrimitiveLong = 5,
    PrimitiveFloat = 6,
    PrimitiveDouble = 7,
    Boolean = 8,
    Byte = 9,
    Character = 10,
    Short = 11,
    Integer = 12,
    Long = 13,
    Float = 14,
    Double = 15,
    JavaSqlTime = 16,
    JavaSqlTimestamp = 17,
    JavaSqlDate = 18,
    JavaUtilDate = 19,
    ByteString = 20,
    String = 21,
    Number = 22,
    Object = 23,
    Null = 24,
    BigInteger = 25,
    BigDecimal = 26,
    Array = 27,
    Struct = 28,
    Multiset = 29,
}

impl Rep {
    /// Reps whose payload lives in `number_value`.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Rep::PrimitiveByte
                | Rep::PrimitiveShort
                | Rep::PrimitiveInt
                | Rep::PrimitiveLong
                | Rep::Byte
                | Rep::Short
                | Rep::Integer
                | Rep::Long
                | Rep::BigInteger
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            Rep::JavaSqlTime | Rep::JavaSqlTimestamp | Rep::JavaSqlDate | Rep::JavaUtilDate
        )
    }
}

/// Outer envelope of every message on the wire.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WireMessage {
    /// Fully-qualified kind identifier, e.g. `...Requests$FetchRequest`.
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bytes = "vec", tag = "2")]
    pub wrapped_message: Vec<u8>,
}

/// A single cell value.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TypedValue {
    #[prost(enumeration = "Rep", tag = "1")]
    pub r#type: i32,
    #[prost(bool, tag = "2")]
    pub bool_value: bool,
    #[prost(string, tag = "3")]
    pub string_value: String,
    #[prost(sint64, tag = "4")]
    pub number_value: i64,
    #[prost(bytes = "vec", tag = "5")]
    pub bytes_value: Vec<u8>,
    #[prost(double, tag = "6")]
    pub double_value: f64,
    #[prost(bool, tag = "7")]
    pub null: bool,
    #[prost(message, repeated, tag = "8")]
    pub array_value: Vec<TypedValue>,
    #[prost(enumeration = "Rep", tag = "9")]
    pub component_type: i32,
    #[prost(bool, tag = "10")]
    pub implicitly_null: bool,
}

impl TypedValue {
    /// The tag, or `None` when the server sent a rep this client does not know.
    pub fn rep(&self) -> Option<Rep> {
        Rep::try_from(self.r#type).ok()
    }
}

/// One cell of a [`Row`]; either a scalar or an array.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ColumnValue {
    /// Legacy encoding, still emitted by some servers.
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<TypedValue>,
    #[prost(message, repeated, tag = "2")]
    pub array_value: Vec<TypedValue>,
    #[prost(bool, tag = "3")]
    pub has_array_value: bool,
    #[prost(message, optional, tag = "4")]
    pub scalar_value: Option<TypedValue>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Row {
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<ColumnValue>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Frame {
    #[prost(uint64, tag = "1")]
    pub offset: u64,
    #[prost(bool, tag = "2")]
    pub done: bool,
    #[prost(message, repeated, tag = "3")]
    pub rows: Vec<Row>,
}

/// SQL type descriptor nested inside column metadata.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AvaticaType {
    /// `java.sql.Types` constant, e.g. 91 for DATE.
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(enumeration = "Rep", tag = "3")]
    pub rep: i32,
    #[prost(message, repeated, tag = "4")]
    pub columns: Vec<ColumnMetaData>,
    #[prost(message, optional, boxed, tag = "5")]
    pub component: Option<Box<AvaticaType>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ColumnMetaData {
    #[prost(uint32, tag = "1")]
    pub ordinal: u32,
    #[prost(bool, tag = "2")]
    pub auto_increment: bool,
    #[prost(bool, tag = "3")]
    pub case_sensitive: bool,
    #[prost(bool, tag = "4")]
    pub searchable: bool,
    #[prost(bool, tag = "5")]
    pub currency: bool,
    #[prost(uint32, tag = "6")]
    pub nullable: u32,
    #[prost(bool, tag = "7")]
    pub signed: bool,
    #[prost(uint32, tag = "8")]
    pub display_size: u32,
    #[prost(string, tag = "9")]
    pub label: String,
    #[prost(string, tag = "10")]
    pub column_name: String,
    #[prost(string, tag = "11")]
    pub schema_name: String,
    #[prost(uint32, tag = "12")]
    pub precision: u32,
    #[prost(uint32, tag = "13")]
    pub scale: u32,
    #[prost(string, tag = "14")]
    pub table_name: String,
    #[prost(string, tag = "15")]
    pub catalog_name: String,
    #[prost(bool, tag = "16")]
    pub read_only: bool,
    #[prost(bool, tag = "17")]
    pub writable: bool,
    #[prost(bool, tag = "18")]
    pub definitely_writable: bool,
    #[prost(string, tag = "19")]
    pub column_class_name: String,
    #[prost(message, optional, tag = "20")]
    pub r#type: Option<AvaticaType>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AvaticaParameter {
    #[prost(bool, tag = "1")]
    pub signed: bool,
    #[prost(uint32, tag = "2")]
    pub precision: u32,
    #[prost(uint32, tag = "3")]
    pub scale: u32,
    #[prost(uint32, tag = "4")]
    pub parameter_type: u32,
    #[prost(string, tag = "5")]
    pub type_name: String,
    #[prost(string, tag = "6")]
    pub class_name: String,
    #[prost(string, tag = "7")]
    pub name: String,
}

/// Shape of a result set: columns in row order, the SQL and its parameters.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Signature {
    #[prost(message, repeated, tag = "1")]
    pub columns: Vec<ColumnMetaData>,
    #[prost(string, tag = "2")]
    pub sql: String,
    #[prost(message, repeated, tag = "3")]
    pub parameters: Vec<AvaticaParameter>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StatementHandle {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub id: u32,
    #[prost(message, optional, tag = "3")]
    pub signature: Option<Signature>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RpcMetadata {
    #[prost(string, tag = "1")]
    pub server_address: String,
}

/// Connection properties passed to `OpenConnectionRequest`.
pub type ConnectionInfo = HashMap<String, String>;

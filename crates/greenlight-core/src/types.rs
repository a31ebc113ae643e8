use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Opaque workflow payload carried by a workflow instance
///
/// This is a wrapper around a JSON value with some helper methods. The engine
/// passes it through unmodified; its schema belongs to the caller.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataPacket {
    /// The inner JSON value
    pub value: serde_json::Value,
}

impl DataPacket {
    /// Create a new data packet from a JSON value
    #[inline]
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Create a null data packet
    #[inline]
    pub fn null() -> Self {
        Self {
            value: serde_json::Value::Null,
        }
    }

    /// Get the inner JSON value
    #[inline]
    pub fn as_value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a mutable reference to the inner JSON value
    #[inline]
    pub fn as_value_mut(&mut self) -> &mut serde_json::Value {
        &mut self.value
    }

    /// Take ownership of the inner JSON value
    #[inline]
    pub fn into_value(self) -> serde_json::Value {
        self.value
    }

    /// Check if the data packet is null
    #[inline]
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Try to convert the data packet to a specific type
    pub fn to<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(self.value.clone())
    }

    /// Create a data packet from a serializable value
    pub fn from<T>(value: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize,
    {
        Ok(Self::new(serde_json::to_value(value)?))
    }
}

impl Default for DataPacket {
    fn default() -> Self {
        Self::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_packet_creation() {
        let packet = DataPacket::new(json!({"name": "test"}));
        assert_eq!(packet.as_value()["name"], "test");
    }

    #[test]
    fn test_data_packet_null() {
        let packet = DataPacket::null();
        assert!(packet.is_null());
        assert!(DataPacket::default().is_null());
    }

    #[test]
    fn test_data_packet_serialization() {
        let original = DataPacket::new(json!({"complex": {"nested": ["array", 123]}}));
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: DataPacket = serde_json::from_str(&serialized).unwrap();
        assert_eq!(*original.as_value(), *deserialized.as_value());
    }

    #[test]
    fn test_data_packet_as_value_mut() {
        let mut packet = DataPacket::new(json!({"mutable": "original"}));
        *packet.as_value_mut() = json!({"mutable": "modified"});
        assert_eq!(packet.as_value()["mutable"], "modified");
    }

    #[test]
    fn test_data_packet_round_trip_typed() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Payload {
            project: String,
            budget: u32,
        }

        let payload = Payload {
            project: "atlas".to_string(),
            budget: 5000,
        };

        let packet = DataPacket::from(&payload).unwrap();
        let back: Payload = packet.to().unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_data_packet_into_value() {
        let packet = DataPacket::new(json!({"convert": "to value"}));
        let value = packet.into_value();
        assert_eq!(value["convert"], "to value");
    }
}

use evdev::BusType;

/// Identity a device carries at creation time. Immutable once a handle is
/// built from it. `country` and `report_descriptor` are only meaningful for
/// UHID-based devices (the PS5 pad); evdev devices leave them at their
/// defaults.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceDefinition {
    pub name: String,
    pub phys: String,
    pub uniq: String,
    #[cfg_attr(feature = "serialize", serde(with = "bus_type_serde"))]
    pub bus: BusType,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    pub country: u8,
    pub report_descriptor: Vec<u8>,
}

impl DeviceDefinition {
    pub fn new(name: impl Into<String>, bus: BusType, vendor: u16, product: u16, version: u16) -> Self {
        DeviceDefinition {
            name: name.into(),
            phys: String::new(),
            uniq: String::new(),
            bus,
            vendor,
            product,
            version,
            country: 0,
            report_descriptor: Vec::new(),
        }
    }

    pub fn with_phys(mut self, phys: impl Into<String>) -> Self {
        self.phys = phys.into();
        self
    }

    pub fn with_uniq(mut self, uniq: impl Into<String>) -> Self {
        self.uniq = uniq.into();
        self
    }
}

#[cfg(feature = "serialize")]
mod bus_type_serde {
    use evdev::BusType;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bus: &BusType, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u16(bus.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BusType, D::Error> {
        Ok(BusType(u16::deserialize(d)?))
    }
}

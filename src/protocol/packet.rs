use crate::impl_enum_discriminant;

/// OpenRGB protocol packet ID.
///
/// See [Open SDK documentation](https://gitlab.com/CalcProgrammer1/OpenRGB/-/wikis/OpenRGB-SDK-Documentation#packet-ids) for more information.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub(crate) enum PacketId {
    /// Request RGBController device count from server.
    RequestControllerCount = 0,

    /// Request RGBController data block.
    RequestControllerData = 1,

    /// Request OpenRGB SDK protocol version from server.
    RequestProtocolVersion = 40,

    /// Send client name string to server.
    SetClientName = 50,

    /// Indicate to clients that device list has updated.
    DeviceListUpdated = 100,

    /// Request profile list. (Protocol 2)
    RequestProfileList = 150,

    /// Save current configuration in a new profile. (Protocol 2)
    RequestSaveProfile = 151,

    /// Load a given profile. (Protocol 2)
    RequestLoadProfile = 152,

    /// Delete a given profile. (Protocol 2)
    RequestDeleteProfile = 153,

    /// Request list of plugins. (Protocol 4)
    RequestPluginList = 200,

    /// Plugin specific request. (Protocol 4)
    PluginSpecific = 201,

    /// RGBController::ResizeZone().
    RGBControllerResizeZone = 1000,

    /// RGBController::ClearSegments(). (Protocol 4)
    RGBControllerClearSegments = 1001,

    /// RGBController::AddSegment(). (Protocol 4)
    RGBControllerAddSegment = 1002,

    /// RGBController::UpdateLEDs().
    RGBControllerUpdateLeds = 1050,

    /// RGBController::UpdateZoneLEDs().
    RGBControllerUpdateZoneLeds = 1051,

    /// RGBController::UpdateSingleLED().
    RGBControllerUpdateSingleLed = 1052,

    /// RGBController::SetCustomMode().
    RGBControllerSetCustomMode = 1100,

    /// RGBController::UpdateMode().
    RGBControllerUpdateMode = 1101,

    /// RGBController::SaveMode(). (Protocol 3)
    RGBControllerSaveMode = 1102,
}

impl_enum_discriminant!(
    PacketId,
    RequestControllerCount: 0,
    RequestControllerData: 1,
    RequestProtocolVersion: 40,
    SetClientName: 50,
    DeviceListUpdated: 100,
    RequestProfileList: 150,
    RequestSaveProfile: 151,
    RequestLoadProfile: 152,
    RequestDeleteProfile: 153,
    RequestPluginList: 200,
    PluginSpecific: 201,
    RGBControllerResizeZone: 1000,
    RGBControllerClearSegments: 1001,
    RGBControllerAddSegment: 1002,
    RGBControllerUpdateLeds: 1050,
    RGBControllerUpdateZoneLeds: 1051,
    RGBControllerUpdateSingleLed: 1052,
    RGBControllerSetCustomMode: 1100,
    RGBControllerUpdateMode: 1101,
    RGBControllerSaveMode: 1102
);

impl PacketId {
    /// Whether a packet of this type mutates controller state and therefore
    /// goes through the per-controller worker queue.
    pub fn is_controller_write(self) -> bool {
        matches!(
            self,
            PacketId::RGBControllerResizeZone
                | PacketId::RGBControllerClearSegments
                | PacketId::RGBControllerAddSegment
                | PacketId::RGBControllerUpdateLeds
                | PacketId::RGBControllerUpdateZoneLeds
                | PacketId::RGBControllerUpdateSingleLed
                | PacketId::RGBControllerSetCustomMode
                | PacketId::RGBControllerUpdateMode
                | PacketId::RGBControllerSaveMode
        )
    }
}

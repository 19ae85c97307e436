use crate::messages::visualization_msgs::{
    InteractiveMarkerControl as ControlMsg, InteractiveMarkerFeedback as FeedbackMsg,
};

/// What a control lets the user do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionMode {
    None,
    Menu,
    MoveAxis,
    MovePlane,
    RotateAxis,
    MoveRotate,
}

impl InteractionMode {
    /// Unknown or unsupported wire values degrade to `None`.
    pub fn from_wire(value: u8) -> Self {
        match value {
            ControlMsg::MENU => Self::Menu,
            ControlMsg::MOVE_AXIS => Self::MoveAxis,
            ControlMsg::MOVE_PLANE => Self::MovePlane,
            ControlMsg::ROTATE_AXIS => Self::RotateAxis,
            ControlMsg::MOVE_ROTATE => Self::MoveRotate,
            _ => Self::None,
        }
    }

    pub fn wire(&self) -> u8 {
        match self {
            Self::None => ControlMsg::NONE,
            Self::Menu => ControlMsg::MENU,
            Self::MoveAxis => ControlMsg::MOVE_AXIS,
            Self::MovePlane => ControlMsg::MOVE_PLANE,
            Self::RotateAxis => ControlMsg::ROTATE_AXIS,
            Self::MoveRotate => ControlMsg::MOVE_ROTATE,
        }
    }

    /// Feedback event a completed interaction in this mode reports.
    pub fn feedback_type(&self) -> FeedbackType {
        match self {
            Self::Menu => FeedbackType::MenuSelect,
            Self::None => FeedbackType::KeepAlive,
            _ => FeedbackType::PoseUpdate,
        }
    }

    pub fn is_manipulable(&self) -> bool {
        !matches!(self, Self::None | Self::Menu)
    }
}

/// How a control's orientation relates to its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrientationMode {
    Inherit,
    Fixed,
    ViewFacing,
}

impl OrientationMode {
    pub fn from_wire(value: u8) -> Self {
        match value {
            ControlMsg::FIXED => Self::Fixed,
            ControlMsg::VIEW_FACING => Self::ViewFacing,
            _ => Self::Inherit,
        }
    }
}

/// Interaction events reported back to the marker server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackType {
    KeepAlive,
    PoseUpdate,
    MenuSelect,
    MouseDown,
    MouseUp,
}

impl FeedbackType {
    pub fn wire(&self) -> u8 {
        match self {
            Self::KeepAlive => FeedbackMsg::KEEP_ALIVE,
            Self::PoseUpdate => FeedbackMsg::POSE_UPDATE,
            Self::MenuSelect => FeedbackMsg::MENU_SELECT,
            Self::MouseDown => FeedbackMsg::MOUSE_DOWN,
            Self::MouseUp => FeedbackMsg::MOUSE_UP,
        }
    }
}

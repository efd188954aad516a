//! GUIDs and event tables of the intrinsic Visual Basic controls.
//!
//! A compiled control records the GUID of its class and a handler table ordered the same way as
//! the class's event list, so the GUID is enough to name every handler slot.

use uguid::{guid, Guid};

/// An intrinsic control class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlType {
    /// Class GUID
    pub guid: Guid,
    /// Class name, as shown in the VB toolbox
    pub name: &'static str,
    /// Event names, in handler table order
    pub events: &'static [&'static str],
}

impl ControlType {
    /// Name of the handler at `index` of the control's handler table.
    #[must_use]
    pub fn event(&self, index: usize) -> Option<&'static str> {
        self.events.get(index).copied()
    }
}

/// Every intrinsic control class.
pub static CONTROLS: [ControlType; 20] = [
    ControlType {
        guid: guid!("33ad5002-6699-11cf-b70c-00aa0060d393"),
        name: "OLE",
        events: &[
            "Click", "DblClick", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress",
            "KeyUp", "LostFocus", "MouseDown", "MouseMove", "MouseUp", "Resize", "Updated",
            "ObjectMove", "Validate",
        ],
    },
    ControlType {
        guid: guid!("33ad4ffa-6699-11cf-b70c-00aa0060d393"),
        name: "Data",
        events: &[
            "Error", "Reposition", "Validate", "DragDrop", "DragOver", "MouseDown", "MouseMove",
            "MouseUp", "Resize", "OLEDragOver", "OLEDragDrop", "OLEGiveFeedback", "OLEStartDrag",
            "OLESetData", "OLECompleteDrag",
        ],
    },
    ControlType {
        guid: guid!("33ad4f2a-6699-11cf-b70c-00aa0060d393"),
        name: "Timer",
        events: &["Timer"],
    },
    ControlType {
        guid: guid!("33ad4f6a-6699-11cf-b70c-00aa0060d393"),
        name: "Menu",
        events: &["Click"],
    },
    ControlType {
        guid: guid!("33ad4eea-6699-11cf-b70c-00aa0060d393"),
        name: "Frame",
        events: &[
            "DragDrop", "DragOver", "MouseDown", "MouseMove", "MouseUp", "Click", "DblClick",
            "OLEDragOver", "OLEDragDrop", "OLEGiveFeedback", "OLEStartDrag", "OLESetData",
            "OLECompleteDrag",
        ],
    },
    ControlType {
        guid: guid!("33ad4ef2-6699-11cf-b70c-00aa0060d393"),
        name: "CommandButton",
        events: &[
            "Click", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress", "KeyUp",
            "LostFocus", "MouseDown", "MouseMove", "MouseUp", "OLEDragOver", "OLEDragDrop",
            "OLEGiveFeedback", "OLEStartDrag", "OLESetData", "OLECompleteDrag",
        ],
    },
    ControlType {
        guid: guid!("33ad4f02-6699-11cf-b70c-00aa0060d393"),
        name: "OptionButton",
        events: &[
            "Click", "DblClick", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress",
            "KeyUp", "LostFocus", "MouseDown", "MouseMove", "MouseUp", "OLEDragOver",
            "OLEDragDrop", "OLEGiveFeedback", "OLEStartDrag", "OLESetData", "OLECompleteDrag",
        ],
    },
    ControlType {
        guid: guid!("33ad4ee2-6699-11cf-b70c-00aa0060d393"),
        name: "TextBox",
        events: &[
            "Change", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress", "KeyUp",
            "LinkClose", "LinkError", "LinkOpen", "LostFocus", "LinkNotify", "MouseDown",
            "MouseMove", "MouseUp", "Click", "DblClick", "OLEDragOver", "OLEDragDrop",
            "OLEGiveFeedback", "OLEStartDrag", "OLESetData", "OLECompleteDrag", "Validate",
        ],
    },
    ControlType {
        guid: guid!("33ad4efa-6699-11cf-b70c-00aa0060d393"),
        name: "CheckBox",
        events: &[
            "Click", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress", "KeyUp",
            "LostFocus", "MouseDown", "MouseMove", "MouseUp", "OLEDragOver", "OLEDragDrop",
            "OLEGiveFeedback", "OLEStartDrag", "OLESetData", "OLECompleteDrag",
        ],
    },
    ControlType {
        guid: guid!("33ad4f0a-6699-11cf-b70c-00aa0060d393"),
        name: "ComboBox",
        events: &[
            "Change", "Click", "DblClick", "DragDrop", "DragOver", "DropDown", "GotFocus",
            "KeyDown", "KeyPress", "KeyUp", "LostFocus", "OLEDragOver", "OLEDragDrop",
            "OLEGiveFeedback", "OLEStartDrag", "OLESetData", "OLECompleteDrag", "Scroll",
            "Validate",
        ],
    },
    ControlType {
        guid: guid!("33ad4eda-6699-11cf-b70c-00aa0060d393"),
        name: "Label",
        events: &[
            "Change", "Click", "DblClick", "DragDrop", "DragOver", "LinkClose", "LinkError",
            "LinkOpen", "MouseDown", "MouseMove", "MouseUp", "LinkNotify", "OLEDragOver",
            "OLEDragDrop", "OLEGiveFeedback", "OLEStartDrag", "OLESetData", "OLECompleteDrag",
        ],
    },
    ControlType {
        guid: guid!("33ad4f3a-6699-11cf-b70c-00aa0060d393"),
        name: "Form",
        events: &[
            "DragDrop", "DragOver", "LinkClose", "LinkError", "LinkExecute", "LinkOpen", "Load",
            "Resize", "Unload", "QueryUnload", "Activate", "Deactivate", "Click", "DblClick",
            "GotFocus", "KeyDown", "KeyPress", "KeyUp", "LostFocus", "MouseDown", "MouseMove",
            "MouseUp", "Paint", "Initialize", "Terminate", "OLEDragOver", "OLEDragDrop",
            "OLEGiveFeedback", "OLEStartDrag", "OLESetData", "OLECompleteDrag",
        ],
    },
    ControlType {
        guid: guid!("33ad4f92-6699-11cf-b70c-00aa0060d393"),
        name: "Image",
        events: &[
            "Click", "DblClick", "DragDrop", "DragOver", "MouseDown", "MouseMove", "MouseUp",
            "OLEDragOver", "OLEDragDrop", "OLEGiveFeedback", "OLEStartDrag", "OLESetData",
            "OLECompleteDrag",
        ],
    },
    ControlType {
        guid: guid!("33ad4ed2-6699-11cf-b70c-00aa0060d393"),
        name: "Picture",
        events: &[
            "Change", "Click", "DblClick", "DragDrop", "DragOver", "GotFocus", "KeyDown",
            "KeyPress", "KeyUp", "LinkClose", "LinkError", "LinkOpen", "LostFocus", "MouseDown",
            "MouseMove", "MouseUp", "Paint", "LinkNotify", "Resize", "OLEDragOver",
            "OLEDragDrop", "OLEGiveFeedback", "OLEStartDrag", "OLESetData", "OLECompleteDrag",
            "Validate",
        ],
    },
    ControlType {
        guid: guid!("33ad4f12-6699-11cf-b70c-00aa0060d393"),
        name: "ListBox",
        events: &[
            "Click", "DblClick", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress",
            "KeyUp", "LostFocus", "MouseDown", "MouseMove", "MouseUp", "OLEDragOver",
            "OLEDragDrop", "OLEGiveFeedback", "OLEStartDrag", "OLESetData", "OLECompleteDrag",
            "Scroll", "ItemCheck", "Validate",
        ],
    },
    ControlType {
        guid: guid!("33ad4f52-6699-11cf-b70c-00aa0060d393"),
        name: "DriveListBox",
        events: &[
            "Change", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress", "KeyUp",
            "LostFocus", "OLEDragOver", "OLEDragDrop", "OLEGiveFeedback", "OLEStartDrag",
            "OLESetData", "OLECompleteDrag", "Scroll", "Validate",
        ],
    },
    ControlType {
        guid: guid!("33ad4f5a-6699-11cf-b70c-00aa0060d393"),
        name: "DirListBox",
        events: &[
            "Change", "Click", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress",
            "KeyUp", "LostFocus", "MouseDown", "MouseMove", "MouseUp", "OLEDragOver",
            "OLEDragDrop", "OLEGiveFeedback", "OLEStartDrag", "OLESetData", "OLECompleteDrag",
            "Scroll", "Validate",
        ],
    },
    ControlType {
        guid: guid!("33ad4f62-6699-11cf-b70c-00aa0060d393"),
        name: "FileListBox",
        events: &[
            "Click", "DblClick", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress",
            "KeyUp", "LostFocus", "MouseDown", "MouseMove", "MouseUp", "PathChange",
            "PatternChange", "OLEDragOver", "OLEDragDrop", "OLEGiveFeedback", "OLEStartDrag",
            "OLESetData", "OLECompleteDrag", "Scroll", "Validate",
        ],
    },
    ControlType {
        guid: guid!("33ad4f22-6699-11cf-b70c-00aa0060d393"),
        name: "VScrollBar",
        events: &[
            "Change", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress", "KeyUp",
            "LostFocus", "Scroll", "Validate",
        ],
    },
    ControlType {
        guid: guid!("33ad4f1a-6699-11cf-b70c-00aa0060d393"),
        name: "HScrollBar",
        events: &[
            "Change", "DragDrop", "DragOver", "GotFocus", "KeyDown", "KeyPress", "KeyUp",
            "LostFocus", "Scroll", "Validate",
        ],
    },
];

/// The intrinsic control class with GUID `guid`.
#[must_use]
pub fn find_control(guid: &Guid) -> Option<&'static ControlType> {
    CONTROLS.iter().find(|control| control.guid == *guid)
}
